// src/packages/traits.rs

//! Interfaces for the external collaborators used by the lifecycle
//!
//! The lifecycle decides what to fetch, extract and run, and when; these
//! traits decide how. Every call blocks until it completes.

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of running a package script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Success,
    /// Non-zero exit; `None` when the process was killed by a signal
    Failed(Option<i32>),
}

impl ScriptStatus {
    pub fn success(&self) -> bool {
        matches!(self, ScriptStatus::Success)
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStatus::Success => f.write_str("success"),
            ScriptStatus::Failed(Some(code)) => write!(f, "exit status {}", code),
            ScriptStatus::Failed(None) => f.write_str("terminated by signal"),
        }
    }
}

/// Acquires artifacts and feed text from a source locator
pub trait Fetcher {
    /// Place the artifact named by `locator` inside `dest_dir`
    ///
    /// Returns the path of the local copy.
    fn fetch(&self, locator: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Read the whole resource named by `locator` as text
    fn fetch_text(&self, locator: &str) -> Result<String>;
}

/// Unpacks an artifact into a directory
pub trait Extractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()>;
}

/// Runs an executable script and reports how it exited
pub trait ScriptRunner {
    fn run(&self, script: &Path) -> Result<ScriptStatus>;
}

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}
