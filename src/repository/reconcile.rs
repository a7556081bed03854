// src/repository/reconcile.rs

//! Merging the upstream feed into the registry
//!
//! The feed is authoritative for content fields and presence: known
//! packages take the feed's version, hash, locator and status, unknown ones
//! are appended, and packages the feed no longer offers are flagged
//! `RemovedFromUpstream`. Records are never dropped, and running the same
//! feed twice changes nothing the second time.

use crate::error::Result;
use crate::registry::{PackageRecord, PackageStatus, Registry};
use tracing::{debug, info};

/// One change applied to the registry during a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncChange {
    /// New package appended from the feed
    Added { name: String, status: PackageStatus },
    /// Version, hash or locator replaced by the feed's values
    ContentUpdated {
        name: String,
        from_version: String,
        to_version: String,
    },
    /// Status replaced by the feed's status
    StatusChanged {
        name: String,
        from: PackageStatus,
        to: PackageStatus,
    },
    /// Package no longer offered upstream
    RemovedUpstream { name: String },
}

/// What a sync did to the registry
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub changes: Vec<SyncChange>,
    /// Feed entries that matched a record exactly
    pub unchanged: usize,
    /// Malformed feed lines that were ignored
    pub skipped_lines: usize,
}

impl SyncReport {
    pub fn added(&self) -> usize {
        self.count(|c| matches!(c, SyncChange::Added { .. }))
    }

    /// Packages whose content or status changed
    pub fn updated(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                SyncChange::ContentUpdated { .. } | SyncChange::StatusChanged { .. }
            )
        })
    }

    pub fn removed(&self) -> usize {
        self.count(|c| matches!(c, SyncChange::RemovedUpstream { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn count(&self, pred: impl Fn(&SyncChange) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }
}

/// Merge `feed` into `registry`
///
/// Capacity for every feed entry is reserved before any record is
/// touched, so a growth failure returns an error with the registry exactly
/// as it was.
pub fn reconcile(registry: &mut Registry, feed: Vec<PackageRecord>) -> Result<SyncReport> {
    registry.reserve(feed.len())?;

    let mut report = SyncReport::default();

    for record in registry.iter_mut() {
        record.present_upstream = false;
    }

    for entry in feed {
        match registry.find_mut(&entry.name) {
            Some(existing) => {
                existing.present_upstream = true;
                let mut changed = false;

                if !existing.same_content(&entry) {
                    info!(
                        "Updating package {}: version {} -> {}, hash {} -> {}, source {} -> {}",
                        entry.name,
                        existing.version,
                        entry.version,
                        existing.content_hash,
                        entry.content_hash,
                        existing.source_locator,
                        entry.source_locator
                    );
                    report.changes.push(SyncChange::ContentUpdated {
                        name: entry.name.clone(),
                        from_version: existing.version.clone(),
                        to_version: entry.version.clone(),
                    });
                    existing.version = entry.version;
                    existing.content_hash = entry.content_hash;
                    existing.source_locator = entry.source_locator;
                    changed = true;
                }

                if existing.status != entry.status {
                    info!(
                        "Updating status for {}: {} -> {}",
                        entry.name, existing.status, entry.status
                    );
                    report.changes.push(SyncChange::StatusChanged {
                        name: entry.name.clone(),
                        from: existing.status,
                        to: entry.status,
                    });
                    existing.status = entry.status;
                    changed = true;
                }

                if !changed {
                    debug!("Package {} is up to date", entry.name);
                    report.unchanged += 1;
                }
            }
            None => {
                info!("Adding new package from upstream: {}", entry.name);
                report.changes.push(SyncChange::Added {
                    name: entry.name.clone(),
                    status: entry.status,
                });
                let mut record = entry;
                record.present_upstream = true;
                registry.append(record)?;
            }
        }
    }

    for record in registry.iter_mut() {
        if record.present_upstream || record.status == PackageStatus::RemovedFromUpstream {
            continue;
        }
        info!("Package {} no longer exists upstream", record.name);
        record.status = PackageStatus::RemovedFromUpstream;
        report.changes.push(SyncChange::RemovedUpstream {
            name: record.name.clone(),
        });
    }

    Ok(report)
}
