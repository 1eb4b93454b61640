//! File locations and timing knobs shared by every ledger component.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// How long a writer waits for the ledger lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between attempts to take a contended lock.
pub const DEFAULT_LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the registry keeps its files, and how long writers wait for the lock.
///
/// All paths are resolved at construction; components never consult the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory that relative paths in manifests and anchors are expressed against.
    pub root_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub anchor_path: PathBuf,
    pub lock_path: PathBuf,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    pub audit_log_path: PathBuf,
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
}

/// On-disk shape of `registry.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    root: Option<PathBuf>,
    ledger_path: Option<PathBuf>,
    anchor_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    public_key_path: Option<PathBuf>,
    private_key_path: Option<PathBuf>,
    audit_log_path: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
    lock_poll_interval_ms: Option<u64>,
}

impl LedgerConfig {
    /// Conventional layout under a single directory.
    ///
    /// ```text
    /// data/ledger.json   anchors/latest.json   data/ledger.lock
    /// keys/public_key.pem   keys/private_key.pem   logs/audit.log.jsonl
    /// ```
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            root_dir: root.to_path_buf(),
            ledger_path: root.join("data").join("ledger.json"),
            anchor_path: root.join("anchors").join("latest.json"),
            lock_path: root.join("data").join("ledger.lock"),
            public_key_path: root.join("keys").join("public_key.pem"),
            private_key_path: root.join("keys").join("private_key.pem"),
            audit_log_path: root.join("logs").join("audit.log.jsonl"),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
        }
    }

    /// Load a TOML config file. Relative paths resolve against the file's directory.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base)
    }

    fn from_file(file: ConfigFile, base: &Path) -> Result<Self, ConfigError> {
        let root = match &file.root {
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };
        let mut config = Self::rooted_at(&root);
        let resolve = |value: Option<PathBuf>, slot: &mut PathBuf| {
            if let Some(value) = value {
                *slot = root.join(value);
            }
        };
        resolve(file.ledger_path, &mut config.ledger_path);
        resolve(file.anchor_path, &mut config.anchor_path);
        resolve(file.lock_path, &mut config.lock_path);
        resolve(file.public_key_path, &mut config.public_key_path);
        resolve(file.private_key_path, &mut config.private_key_path);
        resolve(file.audit_log_path, &mut config.audit_log_path);

        if let Some(ms) = file.lock_timeout_ms {
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.lock_poll_interval_ms {
            if ms == 0 {
                return Err(ConfigError::Invalid(
                    "lock_poll_interval_ms must be greater than zero".to_string(),
                ));
            }
            config.lock_poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Render a path relative to `root_dir` with forward slashes.
    ///
    /// Paths outside the root are rendered in full.
    pub fn display_path(&self, path: &Path) -> String {
        let shown = path.strip_prefix(&self.root_dir).unwrap_or(path);
        shown.to_string_lossy().replace('\\', "/")
    }
}
