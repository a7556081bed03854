// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pkgstate::config::Layout;
use pkgstate::lifecycle::{
    Collaborators, Coordinator, InstallOutcome, RemoveOutcome, UpdateOutcome,
};
use pkgstate::registry::{PackageRecord, PackageStatus};
use pkgstate::repository::{SyncChange, SyncReport};
use std::io;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "pkgstate")]
#[command(author, version, about = "Local package-state manager driven by an upstream feed", long_about = None)]
struct Cli {
    /// Directory holding the registry, installed records and staging area
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Upstream feed path or URL (default: <root>/upstream.list)
    #[arg(short, long, global = true)]
    feed: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the registry with the upstream feed
    Sync,
    /// Search the registry by name substring
    Search {
        /// Substring to look for
        term: String,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one package by exact name
    Show {
        /// Package name
        name: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Install a package from the registry
    Install {
        /// Package name
        name: String,
    },
    /// Remove an installed package
    Remove {
        /// Package name
        name: String,
    },
    /// Upgrade every installed package with a newer registry version
    Upgrade {
        /// Only upgrade packages with this status (code or name)
        status: Option<PackageStatus>,
    },
    /// Upgrade one installed package
    Update {
        /// Package name
        name: String,
    },
    /// Register a package by hand
    Add {
        /// Package name
        name: String,
        /// Package version
        #[arg(value_name = "VERSION")]
        pkg_version: String,
        /// Artifact path or URL
        locator: String,
        /// SHA-256 of the artifact (64 hex digits)
        hash: String,
    },
    /// List registry records with a status
    List {
        /// Status code (0-5) or name
        status: PackageStatus,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List installed packages
    Installed,
    /// Print the SHA-256 digest of a local file
    Hash {
        /// File to hash
        path: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    fn layout(&self) -> Layout {
        let layout = Layout::under(&self.root);
        match &self.feed {
            Some(feed) => layout.with_feed(feed.clone()),
            None => layout,
        }
    }

    fn coordinator(&self) -> Result<Coordinator> {
        let ops = Collaborators::system(self.yes)?;
        Ok(Coordinator::new(self.layout(), ops))
    }
}

fn print_record(record: &PackageRecord) {
    println!("{} {}", record.name, record.version);
    println!("  Status: {} ({})", record.status, record.status.code());
    println!("  Source: {}", record.source_locator);
    println!("  SHA-256: {}", record.content_hash);
}

fn print_records(records: &[&PackageRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No packages found.");
        return Ok(());
    }

    for record in records {
        print_record(record);
    }
    println!("\nTotal: {} package(s)", records.len());
    Ok(())
}

fn describe_change(change: &SyncChange) -> String {
    match change {
        SyncChange::Added { name, status } => format!("Added {} ({})", name, status),
        SyncChange::ContentUpdated {
            name,
            from_version,
            to_version,
        } => format!("Updated {}: {} -> {}", name, from_version, to_version),
        SyncChange::StatusChanged { name, from, to } => {
            format!("Status of {} changed: {} -> {}", name, from, to)
        }
        SyncChange::RemovedUpstream { name } => format!("Removed upstream: {}", name),
    }
}

fn print_sync_report(report: &SyncReport) {
    for change in &report.changes {
        println!("  {}", describe_change(change));
    }
    if report.skipped_lines > 0 {
        println!("  Skipped {} malformed feed line(s)", report.skipped_lines);
    }
    println!(
        "Registry synchronized: {} added, {} updated, {} removed upstream, {} unchanged",
        report.added(),
        report.updated(),
        report.removed(),
        report.unchanged
    );
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Sync) => {
            let coordinator = cli.coordinator()?;
            let mut registry = coordinator.load_registry()?;
            let report = coordinator.sync(&mut registry)?;
            print_sync_report(&report);
            Ok(())
        }
        Some(Commands::Search { term, json }) => {
            let coordinator = cli.coordinator()?;
            let registry = coordinator.load_registry()?;
            print_records(&registry.search(term), *json)
        }
        Some(Commands::Show { name, json }) => {
            let coordinator = cli.coordinator()?;
            let registry = coordinator.load_registry()?;
            let record = registry
                .find(name)
                .ok_or_else(|| anyhow::anyhow!("Package '{}' is not in the registry", name))?;

            if *json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else {
                print_record(record);
                println!("  State: {}", coordinator.package_state(&registry, name)?);
            }
            Ok(())
        }
        Some(Commands::Install { name }) => {
            info!("Installing package: {}", name);
            let coordinator = cli.coordinator()?;
            let registry = coordinator.load_registry()?;

            match coordinator.install(&registry, name)? {
                InstallOutcome::Installed {
                    name,
                    version,
                    script,
                } => {
                    println!(
                        "Installed package: {} version {}",
                        name,
                        version.as_deref().unwrap_or("unknown")
                    );
                    if let Some(status) = script {
                        println!("  Install script: {}", status);
                    }
                }
                InstallOutcome::NoManifest { name } => {
                    println!("Package {} has no MANIFEST; nothing was recorded", name);
                }
                InstallOutcome::Declined => println!("Installation cancelled."),
            }
            Ok(())
        }
        Some(Commands::Remove { name }) => {
            info!("Removing package: {}", name);
            let coordinator = cli.coordinator()?;

            match coordinator.remove(name)? {
                RemoveOutcome::Removed { name, script } => {
                    println!("Removed package: {}", name);
                    if let Some(status) = script {
                        println!("  Uninstall script: {}", status);
                    }
                }
                RemoveOutcome::Declined => println!("Removal cancelled."),
            }
            Ok(())
        }
        Some(Commands::Upgrade { status }) => {
            let coordinator = cli.coordinator()?;
            let mut registry = coordinator.load_registry()?;
            let sync = coordinator.sync(&mut registry)?;
            print_sync_report(&sync);

            let report = coordinator.upgrade(&registry, *status)?;
            if report.upgraded.is_empty() && report.declined.is_empty() && report.failed.is_empty() {
                println!("All installed packages are up to date.");
                return Ok(());
            }

            for candidate in &report.upgraded {
                println!(
                    "Upgraded {}: {} -> {}",
                    candidate.name, candidate.installed_version, candidate.available_version
                );
            }
            for candidate in &report.declined {
                println!("Skipped {}", candidate.name);
            }
            for (candidate, error) in &report.failed {
                println!("Failed to upgrade {}: {}", candidate.name, error);
            }
            println!(
                "\nTotal: {} upgraded, {} skipped, {} failed",
                report.upgraded.len(),
                report.declined.len(),
                report.failed.len()
            );
            Ok(())
        }
        Some(Commands::Update { name }) => {
            let coordinator = cli.coordinator()?;
            let mut registry = coordinator.load_registry()?;
            let sync = coordinator.sync(&mut registry)?;
            print_sync_report(&sync);

            match coordinator.update(&registry, name)? {
                UpdateOutcome::Upgraded { name, from, to } => {
                    println!("Updated {}: {} -> {}", name, from, to);
                }
                UpdateOutcome::UpToDate { name, version } => {
                    println!("{} is up to date ({})", name, version);
                }
                UpdateOutcome::VersionUnknown { name } => {
                    println!("{} records no installed version; not updating", name);
                }
                UpdateOutcome::Declined => println!("Update cancelled."),
            }
            Ok(())
        }
        Some(Commands::Add {
            name,
            pkg_version,
            locator,
            hash,
        }) => {
            let coordinator = cli.coordinator()?;
            let mut registry = coordinator.load_registry()?;
            let record = coordinator.add_manual(&mut registry, name, pkg_version, locator, hash)?;
            println!("Added package: {} version {}", record.name, record.version);
            Ok(())
        }
        Some(Commands::List { status, json }) => {
            let coordinator = cli.coordinator()?;
            let registry = coordinator.load_registry()?;
            print_records(&registry.with_status(*status), *json)
        }
        Some(Commands::Installed) => {
            let coordinator = cli.coordinator()?;
            let store = coordinator.store();
            let names = store.list()?;

            if names.is_empty() {
                println!("No packages installed.");
                return Ok(());
            }

            println!("Installed packages:");
            for name in &names {
                match store.installed_version(name) {
                    Ok(version) => {
                        println!("  {} {}", name, version.as_deref().unwrap_or("(no version)"))
                    }
                    Err(e) => println!("  {} ({})", name, e),
                }
            }
            println!("\nTotal: {} package(s)", names.len());
            Ok(())
        }
        Some(Commands::Hash { path }) => {
            let digest = pkgstate::repository::file_sha256(path)?;
            println!("{}  {}", digest, path.display());
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "pkgstate", &mut io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("pkgstate v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'pkgstate --help' for usage information");
            Ok(())
        }
    }
}
