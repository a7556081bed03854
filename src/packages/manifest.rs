// src/packages/manifest.rs

//! Package MANIFEST parser
//!
//! A manifest is a small `key: value` text file at the top of an extracted
//! package:
//!
//! ```text
//! version: 1.2
//! install: install.sh      # run after extraction
//! uninstall: uninstall.sh
//! helper: common.sh cleanup.sh
//! ```
//!
//! Values stop at `#` or end of line. `version`, `install` and `uninstall`
//! honor their first occurrence only; every `helper` line contributes its
//! tokens. Unknown keys are ignored.

use std::path::{Component, Path};
use tracing::{debug, warn};

/// File name of the manifest inside a package and inside its installed record
pub const MANIFEST_FILE: &str = "MANIFEST";

/// Parsed view of a manifest
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: Option<String>,
    pub install_script: Option<String>,
    pub uninstall_script: Option<String>,
    pub helper_files: Vec<String>,
}

impl Manifest {
    /// Parse manifest text
    pub fn parse(content: &str) -> Self {
        let mut manifest = Manifest::default();

        for line in content.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = strip_comment(value);

            match key.trim() {
                "version" => {
                    if manifest.version.is_none() {
                        manifest.version = non_empty(value).map(str::to_string);
                    }
                }
                "install" => {
                    if manifest.install_script.is_none() {
                        manifest.install_script = script_name("install", value);
                    }
                }
                "uninstall" => {
                    if manifest.uninstall_script.is_none() {
                        manifest.uninstall_script = script_name("uninstall", value);
                    }
                }
                "helper" => {
                    manifest.helper_files.extend(
                        value
                            .split_whitespace()
                            .filter(|token| accept_file_name("helper", token))
                            .map(str::to_string),
                    );
                }
                other => debug!("Ignoring manifest key '{}'", other),
            }
        }

        manifest
    }

    /// Every file the manifest asks to keep: install, uninstall, then helpers
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.install_script
            .as_deref()
            .into_iter()
            .chain(self.uninstall_script.as_deref())
            .chain(self.helper_files.iter().map(String::as_str))
    }
}

fn strip_comment(value: &str) -> &str {
    value.split('#').next().unwrap_or_default()
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// First token of a script value, when it is a usable file name
fn script_name(key: &str, value: &str) -> Option<String> {
    let token = value.split_whitespace().next()?;
    accept_file_name(key, token).then(|| token.to_string())
}

fn accept_file_name(key: &str, token: &str) -> bool {
    if is_plain_file_name(token) {
        true
    } else {
        warn!("Ignoring {} entry '{}': not a plain file name", key, token);
        false
    }
}

/// True when `name` names a file directly inside a directory
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
