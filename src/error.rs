// src/error.rs

use thiserror::Error;

/// Core error types for pkgstate
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O errors with context about the path or step that failed
    #[error("I/O error: {0}")]
    IoError(String),

    /// Registry growth could not be satisfied; held records are untouched
    #[error("Failed to grow package registry: {0}")]
    AllocationError(#[from] std::collections::TryReserveError),

    /// Feed or artifact acquisition failed
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Archive extraction failed
    #[error("Extraction error: {0}")]
    ExtractError(String),

    /// Package already has an installed record
    #[error("Package '{0}' is already installed")]
    AlreadyInstalled(String),

    /// Package missing from the registry
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Package has no installed record
    #[error("Package '{0}' is not installed")]
    NotInstalled(String),

    /// Installed record exists but its manifest cannot be read
    #[error("Manifest missing for installed package '{0}'")]
    MissingManifest(String),

    /// Name already taken in the registry
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Record fields rejected by validation
    #[error("Invalid package record: {0}")]
    InvalidRecord(String),

    /// Installed record directory still holds files after removal
    #[error("Residual files left in {0}; remove it manually")]
    ResidualFiles(String),
}

/// Result type alias using pkgstate's Error type
pub type Result<T> = std::result::Result<T, Error>;
