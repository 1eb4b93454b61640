use crate::manifest::{backup_path, backup_relpath, verify_backup, Manifest};
use crate::BackupError;
use cr_ledger::{atomic_copy, LedgerConfig, LedgerEngine};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a restore put back in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Live paths that were overwritten from the backup.
    pub restored: Vec<PathBuf>,
    /// True when the backup had no anchor and one was rebuilt from the ledger.
    pub anchor_rebuilt: bool,
    pub verified_blocks: usize,
}

/// Restore a backup over the live files, then verify the restored chain.
///
/// The backup must hold a manifest and a ledger, and is checked against the
/// manifest before anything live is touched. The public key is only restored when `restore_public_key` is set.
/// A chain that fails verification after the copy is reported, not rolled back.
pub fn restore<P: AsRef<Path>>(
    config: &LedgerConfig,
    backup_dir: P,
    restore_public_key: bool,
) -> Result<RestoreReport, BackupError> {
    let backup_dir = backup_dir.as_ref();
    Manifest::read(backup_dir)?;

    let ledger_backup = backup_path(backup_dir, &backup_relpath(config, &config.ledger_path));
    if !ledger_backup.is_file() {
        return Err(BackupError::LedgerMissing(ledger_backup));
    }
    verify_backup(backup_dir)?;

    let engine = LedgerEngine::new(config.clone());
    let store = engine.store();
    let mut restored = Vec::new();
    let mut anchor_rebuilt = false;
    {
        let guard = store.lock()?;

        atomic_copy(&ledger_backup, &config.ledger_path)?;
        restored.push(config.ledger_path.clone());

        let anchor_backup =
            backup_path(backup_dir, &backup_relpath(config, &config.anchor_path));
        if anchor_backup.is_file() {
            atomic_copy(&anchor_backup, &config.anchor_path)?;
            restored.push(config.anchor_path.clone());
        } else if let Some(ledger) = store.read_ledger()? {
            store.write_anchor_locked(&guard, &ledger)?;
            anchor_rebuilt = true;
        }

        if restore_public_key {
            let key_backup =
                backup_path(backup_dir, &backup_relpath(config, &config.public_key_path));
            if key_backup.is_file() {
                atomic_copy(&key_backup, &config.public_key_path)?;
                restored.push(config.public_key_path.clone());
            }
        }
    }

    let ledger = store
        .read_ledger()?
        .ok_or_else(|| BackupError::LedgerMissing(config.ledger_path.clone()))?;
    engine
        .verify(&ledger)
        .map_err(BackupError::RestoreVerificationFailed)?;

    info!(
        backup = %backup_dir.display(),
        blocks = ledger.len(),
        "restore complete"
    );
    Ok(RestoreReport {
        restored,
        anchor_rebuilt,
        verified_blocks: ledger.len(),
    })
}
