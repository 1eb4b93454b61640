use crate::manifest::{backup_path, backup_relpath, Manifest, MANIFEST_FILE};
use crate::BackupError;
use chrono::Utc;
use cr_canon::sha256_file;
use cr_ledger::{utc_now_seconds, write_json_atomic, LedgerConfig, LedgerStore};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Create a fresh, uniquely named directory under `backup_root`.
fn create_backup_dir(backup_root: &Path) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(backup_root).map_err(|e| BackupError::storage(backup_root, e))?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    let mut suffix = 0u32;
    loop {
        let name = match suffix {
            0 => stamp.clone(),
            n => format!("{stamp}-{n}"),
        };
        let candidate = backup_root.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(BackupError::storage(candidate, e)),
        }
    }
}

/// Copy the registry files into a new timestamped directory under `backup_root`.
///
/// The ledger is required. The anchor, public key and audit log are copied
/// when present. Writers are locked out while files are copied so the ledger
/// and anchor in the snapshot agree.
pub fn snapshot<P: AsRef<Path>>(
    config: &LedgerConfig,
    backup_root: P,
) -> Result<PathBuf, BackupError> {
    if !config.ledger_path.exists() {
        return Err(BackupError::SourceMissing(config.ledger_path.clone()));
    }

    let store = LedgerStore::new(config.clone());
    let _guard = store.lock()?;
    let backup_dir = create_backup_dir(backup_root.as_ref())?;

    let candidates = [
        &config.ledger_path,
        &config.anchor_path,
        &config.public_key_path,
        &config.audit_log_path,
    ];
    let mut files = BTreeMap::new();

    for live in candidates {
        if !live.exists() {
            continue;
        }
        let relpath = backup_relpath(config, live);
        let target = backup_path(&backup_dir, &relpath);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BackupError::storage(parent, e))?;
        }
        fs::copy(live, &target).map_err(|e| BackupError::storage(live, e))?;
        let digest = sha256_file(&target).map_err(|e| BackupError::storage(&target, e))?;
        debug!(path = %relpath, size_bytes = digest.size_bytes, "copied into backup");
        files.insert(relpath, digest);
    }

    let manifest = Manifest {
        created_at_utc: utc_now_seconds(),
        files,
    };
    write_json_atomic(&backup_dir.join(MANIFEST_FILE), &manifest)?;

    info!(
        backup = %backup_dir.display(),
        files = manifest.files.len(),
        "backup written"
    );
    Ok(backup_dir)
}
