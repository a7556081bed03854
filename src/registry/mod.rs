// src/registry/mod.rs

//! Package registry
//!
//! The registry is the in-memory list of every package the tool knows
//! about, installed or not. It is loaded in full from a flat-file store at
//! the start of a command and written back in full at the end; records are
//! never deleted, only re-flagged.

pub mod record;

use crate::error::{Error, Result};
use record::{LineError, ParsedRecords, SkippedLine};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Classification attached to a registry record
///
/// The numeric codes are the on-disk representation and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageStatus {
    Update,
    SecurityUpdate,
    Mandatory,
    Optional,
    RemovedFromUpstream,
    Manual,
}

impl PackageStatus {
    pub const ALL: [PackageStatus; 6] = [
        PackageStatus::Update,
        PackageStatus::SecurityUpdate,
        PackageStatus::Mandatory,
        PackageStatus::Optional,
        PackageStatus::RemovedFromUpstream,
        PackageStatus::Manual,
    ];

    /// Status code written to the store
    pub fn code(self) -> u8 {
        match self {
            PackageStatus::Update => 0,
            PackageStatus::SecurityUpdate => 1,
            PackageStatus::Mandatory => 2,
            PackageStatus::Optional => 3,
            PackageStatus::RemovedFromUpstream => 4,
            PackageStatus::Manual => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn as_str(&self) -> &str {
        match self {
            PackageStatus::Update => "update",
            PackageStatus::SecurityUpdate => "security-update",
            PackageStatus::Mandatory => "mandatory",
            PackageStatus::Optional => "optional",
            PackageStatus::RemovedFromUpstream => "removed",
            PackageStatus::Manual => "manual",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = String;

    /// Accepts either the numeric code or the name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| format!("Invalid status code: {}", s));
        }
        match s {
            "update" => Ok(PackageStatus::Update),
            "security-update" | "security" => Ok(PackageStatus::SecurityUpdate),
            "mandatory" => Ok(PackageStatus::Mandatory),
            "optional" => Ok(PackageStatus::Optional),
            "removed" | "removed-from-upstream" => Ok(PackageStatus::RemovedFromUpstream),
            "manual" => Ok(PackageStatus::Manual),
            _ => Err(format!("Invalid package status: {}", s)),
        }
    }
}

/// A package the registry knows about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub content_hash: String,
    pub source_locator: String,
    pub status: PackageStatus,
    /// Only meaningful during a reconciliation pass; never persisted
    #[serde(skip)]
    pub present_upstream: bool,
}

impl PackageRecord {
    /// Create a new record that has not been seen upstream
    pub fn new(
        name: String,
        version: String,
        content_hash: String,
        source_locator: String,
        status: PackageStatus,
    ) -> Self {
        Self {
            name,
            version,
            content_hash,
            source_locator,
            status,
            present_upstream: false,
        }
    }

    /// Version, hash and locator all match `other`
    pub fn same_content(&self, other: &PackageRecord) -> bool {
        self.version == other.version
            && self.content_hash == other.content_hash
            && self.source_locator == other.source_locator
    }

    /// Store line, without trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name,
            self.version,
            self.content_hash,
            self.source_locator,
            self.status.code()
        )
    }
}

/// The package registry
#[derive(Debug, Default, Clone)]
pub struct Registry {
    records: Vec<PackageRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse store text
    ///
    /// Returns the registry together with every rejected line; a repeated
    /// name keeps its first occurrence and reports the later ones.
    pub fn parse(text: &str) -> (Self, Vec<SkippedLine>) {
        let mut seen = HashSet::new();
        let ParsedRecords { records, skipped } = record::parse_records_with(text, |r| {
            if seen.insert(r.name.clone()) {
                Ok(())
            } else {
                Err(LineError::Duplicate(r.name.clone()))
            }
        });

        (Self { records }, skipped)
    }

    /// Load the registry store at `path`
    ///
    /// A missing store is an empty registry, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found, starting with an empty registry", path.display());
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read registry store {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let (registry, skipped) = Self::parse(&text);
        for line in &skipped {
            warn!(
                "Skipping invalid line {} in {}: {} ({})",
                line.line_number,
                path.display(),
                line.content,
                line.reason
            );
        }
        debug!("Read {} packages from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Serialized store contents, one line per record in registry order
    pub fn to_store_string(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        out
    }

    /// Write the registry store to `path`
    ///
    /// The text goes to a sibling temp file first and is renamed into
    /// place, so a failed write leaves the previous store intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| {
            Error::IoError(format!("Failed to open {} for writing: {}", temp_path.display(), e))
        })?;
        file.write_all(self.to_store_string().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| {
                Error::IoError(format!("Failed to write {}: {}", temp_path.display(), e))
            })?;

        fs::rename(&temp_path, path).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        debug!("Wrote {} packages to {}", self.len(), path.display());
        Ok(())
    }

    /// Exact-name lookup
    pub fn find(&self, name: &str) -> Option<&PackageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut PackageRecord> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Make room for `additional` records without touching existing ones
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.records.try_reserve(additional)?;
        Ok(())
    }

    /// Append a record whose name is not yet registered
    pub fn append(&mut self, record: PackageRecord) -> Result<()> {
        if self.contains(&record.name) {
            return Err(Error::ConflictError(format!(
                "Package '{}' already exists in the registry",
                record.name
            )));
        }
        self.reserve(1)?;
        self.records.push(record);
        Ok(())
    }

    /// Register a package by hand with status `Manual`
    pub fn add_manual(
        &mut self,
        name: &str,
        version: &str,
        source_locator: &str,
        content_hash: &str,
    ) -> Result<&PackageRecord> {
        let record = PackageRecord::new(
            name.to_string(),
            version.to_string(),
            content_hash.to_string(),
            source_locator.to_string(),
            PackageStatus::Manual,
        );
        record::validate(&record).map_err(|e| Error::InvalidRecord(e.to_string()))?;

        if content_hash.len() != 64 || !content_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidRecord(format!(
                "content hash must be 64 hex digits, got '{}'",
                content_hash
            )));
        }

        self.append(record)?;
        info!("Added manual package {} version {}", name, version);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Records whose name contains `term`
    pub fn search(&self, term: &str) -> Vec<&PackageRecord> {
        self.records.iter().filter(|r| r.name.contains(term)).collect()
    }

    /// Records carrying `status`
    pub fn with_status(&self, status: PackageStatus) -> Vec<&PackageRecord> {
        self.records.iter().filter(|r| r.status == status).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PackageRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
