// src/repository/mod.rs

//! Upstream feed and artifact acquisition
//!
//! This module provides functionality for:
//! - Downloading artifacts and the upstream feed with retry support
//! - Copying artifacts that live on the local filesystem
//! - Synchronizing the package registry against the upstream feed
//! - Computing SHA-256 digests of local artifacts

pub mod reconcile;

pub use reconcile::{SyncChange, SyncReport, reconcile};

use crate::error::{Error, Result};
use crate::packages::traits::Fetcher;
use crate::registry::{Registry, record};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// True for `http://` and `https://` locators; anything else is a local path
pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// File name used for the local copy of an artifact
fn artifact_file_name(locator: &str) -> &str {
    locator
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("artifact")
}

/// HTTP client wrapper with retry support
pub struct RepositoryClient {
    client: Client,
    max_retries: u32,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Fetch a text resource with retry support
    pub fn fetch_remote_text(&self, url: &str) -> Result<String> {
        info!("Fetching {}", url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    return response.text().map_err(|e| {
                        Error::DownloadError(format!("Failed to read response from {}: {}", url, e))
                    });
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {} after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!("Fetch attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }

    /// Download a file to the specified path with retry support
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(mut response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    // Write to temporary file first
                    let temp_path = dest_path.with_extension("part");
                    let mut file = File::create(&temp_path).map_err(|e| {
                        Error::IoError(format!("Failed to create file {}: {}", temp_path.display(), e))
                    })?;

                    io::copy(&mut response, &mut file).map_err(|e| {
                        Error::IoError(format!("Failed to write downloaded data: {}", e))
                    })?;

                    fs::rename(&temp_path, dest_path).map_err(|e| {
                        Error::IoError(format!(
                            "Failed to move {} to {}: {}",
                            temp_path.display(),
                            dest_path.display(),
                            e
                        ))
                    })?;

                    info!("Successfully downloaded to {}", dest_path.display());
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to download after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    warn!("Download attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

impl Fetcher for RepositoryClient {
    fn fetch(&self, locator: &str, dest_dir: &Path) -> Result<PathBuf> {
        let dest_path = dest_dir.join(artifact_file_name(locator));

        if is_remote(locator) {
            self.download_file(locator, &dest_path)?;
            return Ok(dest_path);
        }

        copy_local_artifact(Path::new(locator), &dest_path)?;
        Ok(dest_path)
    }

    fn fetch_text(&self, locator: &str) -> Result<String> {
        if is_remote(locator) {
            return self.fetch_remote_text(locator);
        }

        fs::read_to_string(locator)
            .map_err(|e| Error::DownloadError(format!("Failed to read {}: {}", locator, e)))
    }
}

/// Copy a local artifact into the staging area
fn copy_local_artifact(source: &Path, dest_path: &Path) -> Result<()> {
    info!("Copying {} to {}", source.display(), dest_path.display());

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {}", parent.display(), e))
        })?;
    }

    let source_canonical = fs::canonicalize(source).map_err(|e| {
        Error::DownloadError(format!("Failed to open local package {}: {}", source.display(), e))
    })?;

    // Copying a file onto itself would truncate it
    if fs::canonicalize(dest_path).is_ok_and(|dest| dest == source_canonical) {
        debug!("{} is already in place", dest_path.display());
        return Ok(());
    }

    fs::copy(&source_canonical, dest_path).map_err(|e| {
        Error::DownloadError(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            dest_path.display(),
            e
        ))
    })?;

    Ok(())
}

/// Read the upstream feed and merge it into `registry`
///
/// Nothing in the registry changes unless the feed was read successfully.
pub fn sync_registry(
    registry: &mut Registry,
    fetcher: &dyn Fetcher,
    feed_locator: &str,
) -> Result<SyncReport> {
    info!("Synchronizing registry from {}", feed_locator);

    let text = fetcher.fetch_text(feed_locator)?;
    let parsed = record::parse_records(&text);

    for line in &parsed.skipped {
        warn!(
            "Skipping invalid line {} in feed: {} ({})",
            line.line_number, line.content, line.reason
        );
    }
    info!("Read {} packages from {}", parsed.records.len(), feed_locator);

    let skipped = parsed.skipped.len();
    let mut report = reconcile(registry, parsed.records)?;
    report.skipped_lines = skipped;

    info!(
        "Synchronized registry: {} added, {} updated, {} removed upstream",
        report.added(),
        report.updated(),
        report.removed()
    );
    Ok(report)
}

/// SHA-256 hex digest of a local file
pub fn file_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};

    debug!("Hashing {}", path.display());

    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

    Ok(format!("{:x}", hasher.finalize()))
}
