// src/packages/prompt.rs

//! Interactive confirmation

use super::traits::Confirm;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Interpret an answer to a `(Y/n)` question
///
/// `None` means no input was available, which counts as a decline.
pub fn parse_answer(input: Option<&str>) -> bool {
    let Some(input) = input else {
        warn!("No confirmation input available, assuming no");
        return false;
    };

    match input.trim_end_matches(['\r', '\n']) {
        "" | "y" | "Y" => true,
        "n" | "N" => false,
        other => {
            warn!("Invalid input '{}', assuming no", other);
            false
        }
    }
}

/// Asks on stdout and reads the answer from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} (Y/n): ", prompt);
        // Prompt may be lost; the answer is still read
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => parse_answer(None),
            Ok(_) => parse_answer(Some(&line)),
        }
    }
}

/// Answers yes to everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}
