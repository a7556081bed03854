// src/lifecycle/mod.rs

//! Install, remove and upgrade coordination
//!
//! The coordinator ties the registry to the installed-package store. A
//! package name moves through these states:
//!
//! - Untracked: not in the registry
//! - Tracked: in the registry, no installed record
//! - Installed: installed record present
//! - UpgradeAvailable: the registry version sorts after the installed one
//!
//! Upgrades remove then reinstall the package. Nothing is rolled back: a
//! failed uninstall still lets the install be attempted, and a failed
//! install script leaves the installed record in place.

use crate::config::Layout;
use crate::error::{Error, Result};
use crate::installed::InstalledStore;
use crate::packages::archive::TarExtractor;
use crate::packages::prompt::{AssumeYes, StdinConfirm};
use crate::packages::script::{ProcessRunner, make_executable};
use crate::packages::{Confirm, Extractor, Fetcher, MANIFEST_FILE, ScriptRunner, ScriptStatus};
use crate::registry::{PackageRecord, PackageStatus, Registry};
use crate::repository::{self, RepositoryClient, SyncReport};
use crate::version;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// External effects the coordinator delegates
pub struct Collaborators {
    pub fetcher: Box<dyn Fetcher>,
    pub extractor: Box<dyn Extractor>,
    pub runner: Box<dyn ScriptRunner>,
    pub confirm: Box<dyn Confirm>,
}

impl Collaborators {
    /// HTTP/local fetching, tar extraction, process execution and either
    /// stdin prompts or automatic yes
    pub fn system(assume_yes: bool) -> Result<Self> {
        let confirm: Box<dyn Confirm> = if assume_yes {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm)
        };

        Ok(Self {
            fetcher: Box::new(RepositoryClient::new()?),
            extractor: Box::new(TarExtractor),
            runner: Box::new(ProcessRunner),
            confirm,
        })
    }
}

/// Where a package name stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageState {
    Untracked,
    Tracked,
    Installed,
    UpgradeAvailable,
}

impl PackageState {
    pub fn as_str(&self) -> &str {
        match self {
            PackageState::Untracked => "untracked",
            PackageState::Tracked => "tracked",
            PackageState::Installed => "installed",
            PackageState::UpgradeAvailable => "upgrade available",
        }
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an install request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        name: String,
        version: Option<String>,
        /// Exit of the install script; `None` when none was run
        script: Option<ScriptStatus>,
    },
    /// The artifact carried no MANIFEST; nothing was recorded or run
    NoManifest { name: String },
    Declined,
}

/// Result of a remove request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed {
        name: String,
        /// Exit of the uninstall script; `None` when none was run
        script: Option<ScriptStatus>,
    },
    Declined,
}

/// A package whose registry version sorts after its installed version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeCandidate {
    pub name: String,
    pub installed_version: String,
    pub available_version: String,
    pub status: PackageStatus,
}

/// What an upgrade pass did, per package
#[derive(Debug, Default)]
pub struct UpgradeReport {
    pub upgraded: Vec<UpgradeCandidate>,
    pub declined: Vec<UpgradeCandidate>,
    pub failed: Vec<(UpgradeCandidate, Error)>,
}

/// Result of a single-package update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Upgraded { name: String, from: String, to: String },
    UpToDate { name: String, version: String },
    /// The installed manifest records no version to compare
    VersionUnknown { name: String },
    Declined,
}

/// Drives package lifecycles for one root
pub struct Coordinator {
    layout: Layout,
    store: InstalledStore,
    ops: Collaborators,
}

impl Coordinator {
    pub fn new(layout: Layout, ops: Collaborators) -> Self {
        let store = InstalledStore::new(layout.installed_dir.clone());
        Self { layout, store, ops }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn store(&self) -> &InstalledStore {
        &self.store
    }

    /// Load the registry store for this root
    pub fn load_registry(&self) -> Result<Registry> {
        Registry::load(&self.layout.registry_file)
    }

    /// Merge the upstream feed into `registry` and persist it
    pub fn sync(&self, registry: &mut Registry) -> Result<SyncReport> {
        let report = repository::sync_registry(registry, self.ops.fetcher.as_ref(), &self.layout.feed)?;
        registry.save(&self.layout.registry_file)?;
        Ok(report)
    }

    /// Register a package by hand and persist the registry
    pub fn add_manual(
        &self,
        registry: &mut Registry,
        name: &str,
        version: &str,
        source_locator: &str,
        content_hash: &str,
    ) -> Result<PackageRecord> {
        let record = registry
            .add_manual(name, version, source_locator, content_hash)?
            .clone();
        registry.save(&self.layout.registry_file)?;
        Ok(record)
    }

    /// Classify `name` against the registry and the installed store
    pub fn package_state(&self, registry: &Registry, name: &str) -> Result<PackageState> {
        let Some(record) = registry.find(name) else {
            return Ok(PackageState::Untracked);
        };

        if !self.store.is_installed(name) {
            return Ok(PackageState::Tracked);
        }

        let installed_version = match self.store.installed_version(name) {
            Ok(version) => version,
            Err(Error::MissingManifest(_)) => None,
            Err(e) => return Err(e),
        };

        match installed_version {
            Some(installed) if version::is_newer(&record.version, &installed) => {
                Ok(PackageState::UpgradeAvailable)
            }
            _ => Ok(PackageState::Installed),
        }
    }

    /// Install a tracked package after confirmation
    ///
    /// A package that already has an installed record is refused; use
    /// `update` or `remove` first.
    pub fn install(&self, registry: &Registry, name: &str) -> Result<InstallOutcome> {
        let record = registry
            .find(name)
            .ok_or_else(|| Error::NotFoundError(format!("Package '{}' is not in the registry", name)))?;

        if self.store.is_installed(name) {
            return Err(Error::AlreadyInstalled(name.to_string()));
        }

        if !self
            .ops
            .confirm
            .confirm(&format!("Install {} version {}?", record.name, record.version))
        {
            info!("Installation of {} declined", name);
            return Ok(InstallOutcome::Declined);
        }

        self.perform_install(record)
    }

    /// Remove an installed package after confirmation
    pub fn remove(&self, name: &str) -> Result<RemoveOutcome> {
        if !self.store.is_installed(name) {
            return Err(Error::NotInstalled(name.to_string()));
        }

        if !self.ops.confirm.confirm(&format!("Remove {}?", name)) {
            info!("Removal of {} declined", name);
            return Ok(RemoveOutcome::Declined);
        }

        self.perform_remove(name)
    }

    /// Installed packages whose registry version is newer
    ///
    /// With `filter`, only records with that status qualify. Packages whose
    /// installed manifest records no version are skipped.
    pub fn upgrade_candidates(
        &self,
        registry: &Registry,
        filter: Option<PackageStatus>,
    ) -> Vec<UpgradeCandidate> {
        let mut candidates = Vec::new();

        for record in registry.iter() {
            if filter.is_some_and(|status| status != record.status) {
                continue;
            }
            if !self.store.is_installed(&record.name) {
                continue;
            }

            let installed_version = match self.store.installed_version(&record.name) {
                Ok(Some(version)) => version,
                Ok(None) => {
                    debug!("No recorded version for {}, skipping", record.name);
                    continue;
                }
                Err(e) => {
                    warn!("Cannot read installed record for {}: {}", record.name, e);
                    continue;
                }
            };

            if version::is_newer(&record.version, &installed_version) {
                candidates.push(UpgradeCandidate {
                    name: record.name.clone(),
                    installed_version,
                    available_version: record.version.clone(),
                    status: record.status,
                });
            }
        }

        candidates
    }

    /// Reinstall every upgrade candidate the user confirms
    pub fn upgrade(&self, registry: &Registry, filter: Option<PackageStatus>) -> Result<UpgradeReport> {
        let mut report = UpgradeReport::default();

        for candidate in self.upgrade_candidates(registry, filter) {
            let prompt = format!(
                "Upgrade {} from {} to {}?",
                candidate.name, candidate.installed_version, candidate.available_version
            );
            if !self.ops.confirm.confirm(&prompt) {
                info!("Upgrade of {} declined", candidate.name);
                report.declined.push(candidate);
                continue;
            }

            let record = registry
                .find(&candidate.name)
                .ok_or_else(|| Error::NotFoundError(candidate.name.clone()))?;

            match self.reinstall(record) {
                Ok(_) => report.upgraded.push(candidate),
                Err(e) => {
                    warn!("Upgrade of {} failed: {}", candidate.name, e);
                    report.failed.push((candidate, e));
                }
            }
        }

        Ok(report)
    }

    /// Upgrade one installed package if the registry has a newer version
    pub fn update(&self, registry: &Registry, name: &str) -> Result<UpdateOutcome> {
        let record = registry
            .find(name)
            .ok_or_else(|| Error::NotFoundError(format!("Package '{}' is not in the registry", name)))?;

        let installed = self
            .store
            .load(name)?
            .ok_or_else(|| Error::NotInstalled(name.to_string()))?;

        let Some(installed_version) = installed.version() else {
            return Ok(UpdateOutcome::VersionUnknown {
                name: name.to_string(),
            });
        };

        if !version::is_newer(&record.version, installed_version) {
            return Ok(UpdateOutcome::UpToDate {
                name: name.to_string(),
                version: installed_version.to_string(),
            });
        }

        let prompt = format!(
            "Update {} from {} to {}?",
            name, installed_version, record.version
        );
        if !self.ops.confirm.confirm(&prompt) {
            info!("Update of {} declined", name);
            return Ok(UpdateOutcome::Declined);
        }

        self.reinstall(record)?;
        Ok(UpdateOutcome::Upgraded {
            name: name.to_string(),
            from: installed_version.to_string(),
            to: record.version.clone(),
        })
    }

    /// Remove then install, attempting the install even if removal failed
    fn reinstall(&self, record: &PackageRecord) -> Result<InstallOutcome> {
        info!("Reinstalling {} at version {}", record.name, record.version);

        if let Err(e) = self.perform_remove(&record.name) {
            warn!("Removal of {} failed: {}; installing anyway", record.name, e);
        }

        self.perform_install(record)
    }

    fn perform_install(&self, record: &PackageRecord) -> Result<InstallOutcome> {
        let name = &record.name;
        info!("Installing {} version {} from {}", name, record.version, record.source_locator);

        fs::create_dir_all(&self.layout.staging_dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create directory {}: {}",
                self.layout.staging_dir.display(),
                e
            ))
        })?;

        let artifact = self
            .ops
            .fetcher
            .fetch(&record.source_locator, &self.layout.staging_dir)?;

        let extraction_dir = self.layout.extraction_dir(name);
        self.ops.extractor.extract(&artifact, &extraction_dir)?;

        let manifest_path = extraction_dir.join(MANIFEST_FILE);
        let manifest_text = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("No {} in package {}; no scripts will run", MANIFEST_FILE, name);
                return Ok(InstallOutcome::NoManifest { name: name.clone() });
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {}",
                    manifest_path.display(),
                    e
                )));
            }
        };

        let installed = self.store.record(name, &manifest_text, &extraction_dir)?;

        let script = match installed.manifest.install_script.as_deref() {
            Some(script) => self.run_script("install", &extraction_dir.join(script)),
            None => {
                debug!("Package {} declares no install script", name);
                None
            }
        };

        Ok(InstallOutcome::Installed {
            name: name.clone(),
            version: installed.manifest.version.clone(),
            script,
        })
    }

    fn perform_remove(&self, name: &str) -> Result<RemoveOutcome> {
        info!("Removing {}", name);

        let installed = match self.store.load(name) {
            Ok(Some(installed)) => Some(installed),
            Ok(None) => return Err(Error::NotInstalled(name.to_string())),
            Err(Error::MissingManifest(_)) => {
                warn!("Installed record for {} has no {}", name, MANIFEST_FILE);
                None
            }
            Err(e) => return Err(e),
        };

        let script = match installed.as_ref().and_then(|p| p.uninstall_script()) {
            Some(script) => self.run_script("uninstall", &script),
            None => {
                debug!("Package {} declares no uninstall script", name);
                None
            }
        };

        self.store.purge(name, installed.as_ref().map(|p| &p.manifest))?;

        Ok(RemoveOutcome::Removed {
            name: name.to_string(),
            script,
        })
    }

    /// Run a package script, reporting every failure as a warning
    fn run_script(&self, kind: &str, script: &Path) -> Option<ScriptStatus> {
        if !script.is_file() {
            warn!("{} script {} not found", kind, script.display());
            return None;
        }

        if let Err(e) = make_executable(script) {
            warn!("{}", e);
        }

        match self.ops.runner.run(script) {
            Ok(status) => {
                if !status.success() {
                    warn!("{} script {} failed: {}", kind, script.display(), status);
                }
                Some(status)
            }
            Err(e) => {
                warn!("{} script {} could not run: {}", kind, script.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Writes an empty artifact; the contents come from `StubExtractor`
    struct StubFetcher {
        feed: String,
    }

    impl Fetcher for StubFetcher {
        fn fetch(&self, locator: &str, dest_dir: &Path) -> Result<PathBuf> {
            if locator.contains("missing") {
                return Err(Error::DownloadError(format!("no such artifact {}", locator)));
            }
            let path = dest_dir.join("artifact.tar");
            fs::write(&path, b"")?;
            Ok(path)
        }

        fn fetch_text(&self, _locator: &str) -> Result<String> {
            Ok(self.feed.clone())
        }
    }

    /// Writes whatever files the test has staged
    struct StubExtractor {
        files: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl Extractor for StubExtractor {
        fn extract(&self, _archive: &Path, dest_dir: &Path) -> Result<()> {
            fs::create_dir_all(dest_dir)?;
            for (name, content) in self.files.borrow().iter() {
                fs::write(dest_dir.join(name), content)?;
            }
            Ok(())
        }
    }

    struct RecordingRunner {
        runs: Rc<RefCell<Vec<PathBuf>>>,
        status: ScriptStatus,
    }

    impl ScriptRunner for RecordingRunner {
        fn run(&self, script: &Path) -> Result<ScriptStatus> {
            self.runs.borrow_mut().push(script.to_path_buf());
            Ok(self.status)
        }
    }

    struct Answer(Rc<Cell<bool>>);

    impl Confirm for Answer {
        fn confirm(&self, _prompt: &str) -> bool {
            self.0.get()
        }
    }

    struct Harness {
        _dir: TempDir,
        coordinator: Coordinator,
        files: Rc<RefCell<Vec<(String, String)>>>,
        runs: Rc<RefCell<Vec<PathBuf>>>,
        answer: Rc<Cell<bool>>,
    }

    impl Harness {
        fn new(feed: &str, script_status: ScriptStatus) -> Self {
            let dir = TempDir::new().unwrap();
            let files = Rc::new(RefCell::new(Vec::new()));
            let runs = Rc::new(RefCell::new(Vec::new()));
            let answer = Rc::new(Cell::new(true));

            let ops = Collaborators {
                fetcher: Box::new(StubFetcher {
                    feed: feed.to_string(),
                }),
                extractor: Box::new(StubExtractor {
                    files: Rc::clone(&files),
                }),
                runner: Box::new(RecordingRunner {
                    runs: Rc::clone(&runs),
                    status: script_status,
                }),
                confirm: Box::new(Answer(Rc::clone(&answer))),
            };
            let coordinator = Coordinator::new(Layout::under(dir.path()), ops);

            Self {
                _dir: dir,
                coordinator,
                files,
                runs,
                answer,
            }
        }

        fn stage(&self, version: &str) {
            *self.files.borrow_mut() = vec![
                (
                    MANIFEST_FILE.to_string(),
                    format!(
                        "version: {}\ninstall: install.sh\nuninstall: uninstall.sh\nhelper: lib.sh\n",
                        version
                    ),
                ),
                ("install.sh".to_string(), "#!/bin/sh\n".to_string()),
                ("uninstall.sh".to_string(), "#!/bin/sh\n".to_string()),
                ("lib.sh".to_string(), "#!/bin/sh\n".to_string()),
            ];
        }

        fn script_names(&self) -> Vec<String> {
            self.runs
                .borrow()
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        }
    }

    const FEED: &str = "foo 1.0 abc /srv/foo.tar 3\nbar 10.0 def /srv/bar.tar 1\n";

    fn synced(harness: &Harness) -> Registry {
        let mut registry = Registry::new();
        harness.coordinator.sync(&mut registry).unwrap();
        registry
    }

    #[test]
    fn test_sync_persists_registry() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);

        assert_eq!(registry.len(), 2);
        let reloaded = harness.coordinator.load_registry().unwrap();
        assert_eq!(reloaded.to_store_string(), FEED);
    }

    #[test]
    fn test_install_records_and_runs_staged_script() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("1.0");

        let outcome = harness.coordinator.install(&registry, "foo").unwrap();

        assert_eq!(
            outcome,
            InstallOutcome::Installed {
                name: "foo".to_string(),
                version: Some("1.0".to_string()),
                script: Some(ScriptStatus::Success),
            }
        );
        let store = harness.coordinator.store();
        assert!(store.is_installed("foo"));
        assert!(store.package_dir("foo").join("lib.sh").is_file());

        let runs = harness.runs.borrow();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0], harness.coordinator.layout().extraction_dir("foo").join("install.sh"));
    }

    #[test]
    fn test_install_unknown_package() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);

        let result = harness.coordinator.install(&registry, "nope");
        assert!(matches!(result, Err(Error::NotFoundError(_))));
    }

    #[test]
    fn test_install_declined_does_nothing() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("1.0");
        harness.answer.set(false);

        assert_eq!(
            harness.coordinator.install(&registry, "foo").unwrap(),
            InstallOutcome::Declined
        );
        assert!(!harness.coordinator.store().is_installed("foo"));
        assert!(harness.runs.borrow().is_empty());
    }

    #[test]
    fn test_install_over_installed_package_is_refused() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        *harness.files.borrow_mut() = vec![
            (MANIFEST_FILE.to_string(), "version: 1.0\nhelper: old.sh\n".to_string()),
            ("old.sh".to_string(), "#!/bin/sh\n".to_string()),
        ];
        harness.coordinator.install(&registry, "foo").unwrap();

        *harness.files.borrow_mut() = vec![
            (MANIFEST_FILE.to_string(), "version: 1.0\nhelper: new.sh\n".to_string()),
            ("new.sh".to_string(), "#!/bin/sh\n".to_string()),
        ];
        let result = harness.coordinator.install(&registry, "foo");
        assert!(matches!(result, Err(Error::AlreadyInstalled(_))));

        let dir = harness.coordinator.store().package_dir("foo");
        assert!(dir.join("old.sh").is_file());
        assert!(!dir.join("new.sh").exists());

        harness.coordinator.remove("foo").unwrap();
        assert!(!harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_install_without_manifest_is_degraded() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        *harness.files.borrow_mut() = vec![("README".to_string(), "hi".to_string())];

        let outcome = harness.coordinator.install(&registry, "foo").unwrap();
        assert_eq!(
            outcome,
            InstallOutcome::NoManifest {
                name: "foo".to_string()
            }
        );
        assert!(!harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_failed_install_script_keeps_record() {
        let harness = Harness::new(FEED, ScriptStatus::Failed(Some(2)));
        let registry = synced(&harness);
        harness.stage("1.0");

        let outcome = harness.coordinator.install(&registry, "foo").unwrap();
        assert!(matches!(
            outcome,
            InstallOutcome::Installed {
                script: Some(ScriptStatus::Failed(Some(2))),
                ..
            }
        ));
        assert!(harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_failed_fetch_aborts_install() {
        let harness = Harness::new("foo 1.0 abc /srv/missing.tar 3\n", ScriptStatus::Success);
        let registry = synced(&harness);

        let result = harness.coordinator.install(&registry, "foo");
        assert!(matches!(result, Err(Error::DownloadError(_))));
        assert!(!harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_remove_runs_uninstall_and_purges() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("1.0");
        harness.coordinator.install(&registry, "foo").unwrap();

        let outcome = harness.coordinator.remove("foo").unwrap();

        assert_eq!(
            outcome,
            RemoveOutcome::Removed {
                name: "foo".to_string(),
                script: Some(ScriptStatus::Success),
            }
        );
        assert!(!harness.coordinator.store().is_installed("foo"));
        assert_eq!(harness.script_names(), vec!["install.sh", "uninstall.sh"]);
        assert_eq!(
            harness.runs.borrow()[1],
            harness.coordinator.store().package_dir("foo").join("uninstall.sh")
        );
    }

    #[test]
    fn test_remove_not_installed() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        assert!(matches!(
            harness.coordinator.remove("foo"),
            Err(Error::NotInstalled(_))
        ));
    }

    #[test]
    fn test_remove_declined_keeps_record() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("1.0");
        harness.coordinator.install(&registry, "foo").unwrap();
        harness.answer.set(false);

        assert_eq!(harness.coordinator.remove("foo").unwrap(), RemoveOutcome::Declined);
        assert!(harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_remove_with_failed_uninstall_still_purges() {
        let harness = Harness::new(FEED, ScriptStatus::Failed(Some(1)));
        let registry = synced(&harness);
        harness.stage("1.0");
        harness.coordinator.install(&registry, "foo").unwrap();

        harness.coordinator.remove("foo").unwrap();
        assert!(!harness.coordinator.store().is_installed("foo"));
    }

    #[test]
    fn test_remove_reports_residual_files() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("1.0");
        harness.coordinator.install(&registry, "foo").unwrap();
        let dir = harness.coordinator.store().package_dir("foo");
        fs::write(dir.join("notes.txt"), "keep").unwrap();

        let result = harness.coordinator.remove("foo");
        assert!(matches!(result, Err(Error::ResidualFiles(_))));
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_upgrade_candidates_byte_wise() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);

        harness.stage("0.9");
        harness.coordinator.install(&registry, "foo").unwrap();
        // "10.0" sorts before "9.0" byte-wise, so bar never qualifies
        harness.stage("9.0");
        harness.coordinator.install(&registry, "bar").unwrap();

        let candidates = harness.coordinator.upgrade_candidates(&registry, None);
        assert_eq!(
            candidates,
            vec![UpgradeCandidate {
                name: "foo".to_string(),
                installed_version: "0.9".to_string(),
                available_version: "1.0".to_string(),
                status: PackageStatus::Mandatory,
            }]
        );

        let filtered = harness
            .coordinator
            .upgrade_candidates(&registry, Some(PackageStatus::SecurityUpdate));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_upgrade_candidates_skip_unversioned() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        *harness.files.borrow_mut() = vec![(MANIFEST_FILE.to_string(), "install: none.sh\n".to_string())];
        harness.coordinator.install(&registry, "foo").unwrap();

        assert!(harness.coordinator.upgrade_candidates(&registry, None).is_empty());
    }

    #[test]
    fn test_upgrade_reinstalls_candidates() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("0.9");
        harness.coordinator.install(&registry, "foo").unwrap();

        harness.stage("1.0");
        let report = harness.coordinator.upgrade(&registry, None).unwrap();

        assert_eq!(report.upgraded.len(), 1);
        assert!(report.failed.is_empty());
        assert_eq!(
            harness.coordinator.store().installed_version("foo").unwrap().as_deref(),
            Some("1.0")
        );
        assert_eq!(
            harness.script_names(),
            vec!["install.sh", "uninstall.sh", "install.sh"]
        );
        assert_eq!(
            harness.coordinator.package_state(&registry, "foo").unwrap(),
            PackageState::Installed
        );
    }

    #[test]
    fn test_upgrade_declined() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("0.9");
        harness.coordinator.install(&registry, "foo").unwrap();
        harness.answer.set(false);

        let report = harness.coordinator.upgrade(&registry, None).unwrap();
        assert_eq!(report.declined.len(), 1);
        assert!(report.upgraded.is_empty());
        assert_eq!(
            harness.coordinator.store().installed_version("foo").unwrap().as_deref(),
            Some("0.9")
        );
    }

    #[test]
    fn test_upgrade_installs_even_when_removal_fails() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        harness.stage("0.9");
        harness.coordinator.install(&registry, "foo").unwrap();
        let dir = harness.coordinator.store().package_dir("foo");
        fs::write(dir.join("stray"), "x").unwrap();

        harness.stage("1.0");
        let report = harness.coordinator.upgrade(&registry, None).unwrap();

        assert_eq!(report.upgraded.len(), 1);
        assert_eq!(
            harness.coordinator.store().installed_version("foo").unwrap().as_deref(),
            Some("1.0")
        );
    }

    #[test]
    fn test_update_outcomes() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);

        assert!(matches!(
            harness.coordinator.update(&registry, "nope"),
            Err(Error::NotFoundError(_))
        ));
        assert!(matches!(
            harness.coordinator.update(&registry, "foo"),
            Err(Error::NotInstalled(_))
        ));

        harness.stage("0.9");
        harness.coordinator.install(&registry, "foo").unwrap();
        harness.stage("1.0");
        assert_eq!(
            harness.coordinator.update(&registry, "foo").unwrap(),
            UpdateOutcome::Upgraded {
                name: "foo".to_string(),
                from: "0.9".to_string(),
                to: "1.0".to_string(),
            }
        );
        assert_eq!(
            harness.coordinator.update(&registry, "foo").unwrap(),
            UpdateOutcome::UpToDate {
                name: "foo".to_string(),
                version: "1.0".to_string(),
            }
        );
    }

    #[test]
    fn test_update_missing_manifest() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        fs::create_dir_all(harness.coordinator.store().package_dir("foo")).unwrap();

        assert!(matches!(
            harness.coordinator.update(&registry, "foo"),
            Err(Error::MissingManifest(_))
        ));
    }

    #[test]
    fn test_package_state_transitions() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let registry = synced(&harness);
        let coordinator = &harness.coordinator;

        assert_eq!(coordinator.package_state(&registry, "nope").unwrap(), PackageState::Untracked);
        assert_eq!(coordinator.package_state(&registry, "foo").unwrap(), PackageState::Tracked);

        harness.stage("0.9");
        coordinator.install(&registry, "foo").unwrap();
        assert_eq!(
            coordinator.package_state(&registry, "foo").unwrap(),
            PackageState::UpgradeAvailable
        );

        coordinator.remove("foo").unwrap();
        assert_eq!(coordinator.package_state(&registry, "foo").unwrap(), PackageState::Tracked);
    }

    #[test]
    fn test_add_manual_persists_and_rejects_duplicates() {
        let harness = Harness::new(FEED, ScriptStatus::Success);
        let mut registry = Registry::new();
        let hash = "a".repeat(64);

        let record = harness
            .coordinator
            .add_manual(&mut registry, "foo", "1.0", "/srv/foo.tar", &hash)
            .unwrap();
        assert_eq!(record.status, PackageStatus::Manual);

        let result = harness
            .coordinator
            .add_manual(&mut registry, "foo", "2.0", "/srv/foo2.tar", &hash);
        assert!(matches!(result, Err(Error::ConflictError(_))));

        let reloaded = harness.coordinator.load_registry().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.find("foo").unwrap().version, "1.0");
    }
}
