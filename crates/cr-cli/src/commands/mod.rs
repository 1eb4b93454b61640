//! Command handlers for the `cr` binary.

pub mod backup;
pub mod bench;
pub mod keys;
pub mod ledger;
pub mod migrate;

use anyhow::{Context as _, Result};
use cr_ledger::LedgerConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the optional config file looked up in the registry root.
pub const CONFIG_FILE: &str = "registry.toml";

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: LedgerConfig,
    pub json: bool,
}

impl Context {
    /// Resolve configuration from an explicit file, `<root>/registry.toml`, or
    /// the conventional layout under `root`, in that order.
    pub fn load(root: &Path, config_file: Option<&Path>, json: bool) -> Result<Self> {
        let config = match config_file {
            Some(path) => LedgerConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                let default_file = root.join(CONFIG_FILE);
                if default_file.is_file() {
                    LedgerConfig::from_toml_file(&default_file).with_context(|| {
                        format!("failed to load config {}", default_file.display())
                    })?
                } else {
                    LedgerConfig::rooted_at(root)
                }
            }
        };
        Ok(Self { config, json })
    }

    /// Resolve a user-supplied path against the registry root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.root_dir.join(path)
        }
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
