// src/installed/mod.rs

//! Installed-package store
//!
//! Each installed package owns one directory named after it, holding the
//! verbatim MANIFEST captured at install time and executable copies of the
//! scripts the manifest names. The directory's existence is the only
//! signal that a package is installed; registry status plays no part.

use crate::error::{Error, Result};
use crate::packages::script::make_executable;
use crate::packages::{MANIFEST_FILE, Manifest};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An installed package as recorded on disk
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub dir: PathBuf,
    pub manifest_text: String,
    pub manifest: Manifest,
}

impl InstalledPackage {
    /// Version recorded in the captured manifest
    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    /// Stored copy of the uninstall script, if the manifest names one
    pub fn uninstall_script(&self) -> Option<PathBuf> {
        self.manifest
            .uninstall_script
            .as_deref()
            .map(|script| self.dir.join(script))
    }
}

/// Directory of per-package installed records
#[derive(Debug, Clone)]
pub struct InstalledStore {
    root: PathBuf,
}

impl InstalledStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.package_dir(name).is_dir()
    }

    /// Names of every installed package, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {}",
                    self.root.display(),
                    e
                )));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Capture a package's manifest and scripts from its extraction directory
    ///
    /// Scripts the manifest names but the package lacks are reported and
    /// skipped. An existing record for the same name is overwritten.
    pub fn record(&self, name: &str, manifest_text: &str, source_dir: &Path) -> Result<InstalledPackage> {
        let dir = self.package_dir(name);
        info!("Recording installed package {} in {}", name, dir.display());

        fs::create_dir_all(&dir).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;

        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, manifest_text).map_err(|e| {
            Error::IoError(format!("Failed to save {}: {}", manifest_path.display(), e))
        })?;

        let manifest = Manifest::parse(manifest_text);
        for file in manifest.files() {
            let source = source_dir.join(file);
            let dest = dir.join(file);

            if !source.is_file() {
                warn!("{} '{}' not found in package {}", file, source.display(), name);
                continue;
            }

            fs::copy(&source, &dest).map_err(|e| {
                Error::IoError(format!(
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    dest.display(),
                    e
                ))
            })?;

            if let Err(e) = make_executable(&dest) {
                warn!("{}", e);
            }
            debug!("Kept {} for {}", file, name);
        }

        Ok(InstalledPackage {
            name: name.to_string(),
            dir,
            manifest_text: manifest_text.to_string(),
            manifest,
        })
    }

    /// Read an installed record
    ///
    /// Returns `Ok(None)` when the package is not installed and
    /// `Error::MissingManifest` when it is but the manifest is gone.
    pub fn load(&self, name: &str) -> Result<Option<InstalledPackage>> {
        if !self.is_installed(name) {
            return Ok(None);
        }

        let dir = self.package_dir(name);
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest_text = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::MissingManifest(name.to_string()));
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {}",
                    manifest_path.display(),
                    e
                )));
            }
        };

        let manifest = Manifest::parse(&manifest_text);
        Ok(Some(InstalledPackage {
            name: name.to_string(),
            dir,
            manifest_text,
            manifest,
        }))
    }

    /// Version from the installed manifest, if installed and recorded
    pub fn installed_version(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .load(name)?
            .and_then(|package| package.manifest.version))
    }

    /// Delete an installed record
    ///
    /// Removes the manifest, every script the manifest names, then the
    /// directory itself. Individual file failures are reported and skipped;
    /// if anything else remains, the directory is left in place and
    /// `Error::ResidualFiles` is returned.
    pub fn purge(&self, name: &str, manifest: Option<&Manifest>) -> Result<()> {
        let dir = self.package_dir(name);

        remove_file_logged(&dir.join(MANIFEST_FILE));
        if let Some(manifest) = manifest {
            for file in manifest.files() {
                remove_file_logged(&dir.join(file));
            }
        }

        info!("Removing package info directory {}", dir.display());
        fs::remove_dir(&dir).map_err(|e| {
            warn!("Failed to remove {}: {}", dir.display(), e);
            Error::ResidualFiles(dir.display().to_string())
        })
    }
}

fn remove_file_logged(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already absent", path.display())
        }
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
