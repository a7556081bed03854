// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print records as JSON")
}

fn build_cli() -> Command {
    Command::new("pkgstate")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pkgstate Contributors")
        .about("Local package-state manager driven by an upstream feed")
        .subcommand_required(false)
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .global(true)
                .value_name("DIR")
                .default_value(".")
                .help("Directory holding the registry, installed records and staging area"),
        )
        .arg(
            Arg::new("feed")
                .short('f')
                .long("feed")
                .global(true)
                .value_name("LOCATOR")
                .help("Upstream feed path or URL (default: <root>/upstream.list)"),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Answer yes to every confirmation"),
        )
        .subcommand(Command::new("sync").about("Synchronize the registry with the upstream feed"))
        .subcommand(
            Command::new("search")
                .about("Search the registry by name substring")
                .arg(Arg::new("term").required(true).help("Substring to look for"))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Show one package by exact name")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("install")
                .about("Install a package from the registry")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove an installed package")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Upgrade every installed package with a newer registry version")
                .arg(Arg::new("status").help("Only upgrade packages with this status (code or name)")),
        )
        .subcommand(
            Command::new("update")
                .about("Upgrade one installed package")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("add")
                .about("Register a package by hand")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(Arg::new("version").required(true).help("Package version"))
                .arg(Arg::new("locator").required(true).help("Artifact path or URL"))
                .arg(Arg::new("hash").required(true).help("SHA-256 of the artifact (64 hex digits)")),
        )
        .subcommand(
            Command::new("list")
                .about("List registry records with a status")
                .arg(Arg::new("status").required(true).help("Status code (0-5) or name"))
                .arg(json_arg()),
        )
        .subcommand(Command::new("installed").about("List installed packages"))
        .subcommand(
            Command::new("hash")
                .about("Print the SHA-256 digest of a local file")
                .arg(Arg::new("path").required(true).help("File to hash")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("pkgstate.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
