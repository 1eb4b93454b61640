use crate::BackupError;
use cr_canon::{sha256_file, FileDigest};
use cr_ledger::{LedgerConfig, LedgerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Contents of `manifest.json`. Keys are forward-slash paths relative to the
/// backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at_utc: String,
    pub files: BTreeMap<String, FileDigest>,
}

impl Manifest {
    pub fn read(backup_dir: &Path) -> Result<Self, BackupError> {
        let path = backup_dir.join(MANIFEST_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::ManifestMissing(path))
            }
            Err(e) => return Err(BackupError::storage(path, e)),
        };
        serde_json::from_str(&text).map_err(|source| {
            BackupError::Ledger(LedgerError::Malformed { path, source })
        })
    }
}

/// Path of a live file inside a backup, relative to the backup directory.
///
/// Files under the configured root keep their root-relative path; anything
/// else is stored under `external/` by file name.
pub(crate) fn backup_relpath(config: &LedgerConfig, live: &Path) -> String {
    match live.strip_prefix(&config.root_dir) {
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            let name = live
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("external/{name}")
        }
    }
}

pub(crate) fn backup_path(backup_dir: &Path, relpath: &str) -> PathBuf {
    relpath
        .split('/')
        .fold(backup_dir.to_path_buf(), |acc, part| acc.join(part))
}

/// Re-hash every file listed in a backup's manifest.
pub fn verify_backup<P: AsRef<Path>>(backup_dir: P) -> Result<Manifest, BackupError> {
    let backup_dir = backup_dir.as_ref();
    let manifest = Manifest::read(backup_dir)?;

    for (relpath, expected) in &manifest.files {
        let path = backup_path(backup_dir, relpath);
        let actual = match sha256_file(&path) {
            Ok(digest) => digest,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::ManifestEntryMissing {
                    path: relpath.clone(),
                })
            }
            Err(e) => return Err(BackupError::storage(path, e)),
        };
        if &actual != expected {
            return Err(BackupError::ManifestMismatch {
                path: relpath.clone(),
            });
        }
        debug!(path = %relpath, "backup file matches manifest");
    }

    Ok(manifest)
}
