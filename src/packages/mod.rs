// src/packages/mod.rs

//! Package contents and the collaborators that handle them
//!
//! This module provides the MANIFEST parser and the default implementations
//! of the extraction, execution and confirmation interfaces declared in
//! `traits`.

pub mod archive;
pub mod manifest;
pub mod prompt;
pub mod script;
pub mod traits;

pub use manifest::{MANIFEST_FILE, Manifest};
pub use traits::{Confirm, Extractor, Fetcher, ScriptRunner, ScriptStatus};
