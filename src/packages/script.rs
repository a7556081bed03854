// src/packages/script.rs

//! Running package scripts as child processes

use super::traits::{ScriptRunner, ScriptStatus};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Mode given to every kept or executed package script
#[cfg(unix)]
const SCRIPT_MODE: u32 = 0o755;

/// Mark `path` executable by everyone, writable by the owner
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_MODE)).map_err(|e| {
            Error::IoError(format!("Failed to make {} executable: {}", path.display(), e))
        })?;
    }

    #[cfg(not(unix))]
    {
        fs::metadata(path)
            .map_err(|e| Error::IoError(format!("Failed to stat {}: {}", path.display(), e)))?;
    }

    Ok(())
}

/// Spawns the script directly and waits for it
///
/// The script runs from its own directory so it can reach files shipped
/// next to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ScriptRunner for ProcessRunner {
    fn run(&self, script: &Path) -> Result<ScriptStatus> {
        let script = std::path::absolute(script).map_err(|e| {
            Error::IoError(format!("Failed to resolve script {}: {}", script.display(), e))
        })?;

        info!("Executing {}", script.display());

        let mut command = Command::new(&script);
        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }

        let status = command.status().map_err(|e| {
            Error::IoError(format!("Failed to execute {}: {}", script.display(), e))
        })?;

        debug!("{} exited with {}", script.display(), status);

        if status.success() {
            Ok(ScriptStatus::Success)
        } else {
            Ok(ScriptStatus::Failed(status.code()))
        }
    }
}
