// src/config.rs

//! On-disk layout for a pkgstate root
//!
//! There is no configuration file: everything hangs off a root directory
//! chosen on the command line, with the feed locator optionally overridden.

use std::path::{Path, PathBuf};

/// Registry store file name under the root
pub const REGISTRY_FILE: &str = "packages.list";

/// Default upstream feed file name under the root
pub const FEED_FILE: &str = "upstream.list";

/// Directory holding one InstalledPackageInfo subdirectory per package
pub const INSTALLED_DIR: &str = "installed";

/// Directory where artifacts are downloaded and extracted
pub const STAGING_DIR: &str = "staging";

/// Resolved paths used by every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Local registry store (five-field lines)
    pub registry_file: PathBuf,
    /// Upstream feed locator, either a path or an http(s) URL
    pub feed: String,
    /// Installed-package metadata root
    pub installed_dir: PathBuf,
    /// Download and extraction area
    pub staging_dir: PathBuf,
}

impl Layout {
    /// Build the default layout under `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            registry_file: root.join(REGISTRY_FILE),
            feed: root.join(FEED_FILE).to_string_lossy().into_owned(),
            installed_dir: root.join(INSTALLED_DIR),
            staging_dir: root.join(STAGING_DIR),
        }
    }

    /// Replace the feed locator
    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = feed.into();
        self
    }

    /// Package-named extraction directory inside the staging area
    pub fn extraction_dir(&self, package_name: &str) -> PathBuf {
        self.staging_dir.join(package_name)
    }
}
