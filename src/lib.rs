// src/lib.rs

//! pkgstate
//!
//! Local package-state manager: tracks a registry of installable packages,
//! reconciles it against an upstream feed, and installs, removes and
//! upgrades packages through the scripts named in each package's MANIFEST.
//!
//! # Architecture
//!
//! - Flat-file registry: one five-field line per package, loaded whole and
//!   saved whole
//! - Reconciliation: the upstream feed is authoritative for content and
//!   presence; records are re-flagged, never deleted
//! - Installed records: one directory per installed package holding its
//!   MANIFEST and script copies
//! - Collaborators: fetching, extraction, script execution and confirmation
//!   sit behind traits so the lifecycle can be driven without side effects

pub mod config;
mod error;
pub mod installed;
pub mod lifecycle;
pub mod packages;
pub mod registry;
pub mod repository;
pub mod version;

pub use error::{Error, Result};
