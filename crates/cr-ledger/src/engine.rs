//! Ledger lifecycle: lazy initialization, verified appends and reads.

use crate::chain::{genesis_body, next_body, seal_block, utc_now_seconds, verify_chain};
use crate::config::LedgerConfig;
use crate::error::{ChainFault, FailureReason, LedgerError};
use crate::store::{LedgerStore, LockGuard};
use crate::types::{Anchor, Block, Entry, Ledger, RecordEntry};
use cr_keys::{load_public_key, load_signing_key, KeyError, VerifyingKey};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Owns the ledger files for one configuration.
///
/// Every mutation holds the writer lock from the moment the ledger is read
/// until the new ledger and anchor are on disk.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    store: LedgerStore,
}

impl LedgerEngine {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            store: LedgerStore::new(config),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        self.store.config()
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Create a signed genesis ledger if none exists, and rebuild a missing anchor.
    pub fn ensure_initialized(&self) -> Result<(), LedgerError> {
        if self.store.ledger_exists() && self.store.anchor_exists() {
            return Ok(());
        }

        let guard = self.store.lock()?;
        match self.store.read_ledger()? {
            Some(ledger) => {
                if !self.store.anchor_exists() {
                    let anchor = self.store.write_anchor_locked(&guard, &ledger)?;
                    info!(latest_index = anchor.latest_index, "regenerated missing anchor");
                }
            }
            None => {
                let signing_key = load_signing_key(&self.config().private_key_path)?;
                let genesis = seal_block(genesis_body(utc_now_seconds()), &signing_key)?;
                let ledger = Ledger::new(genesis);
                self.store.save_locked(&guard, &ledger)?;
                info!(
                    ledger = %self.config().ledger_path.display(),
                    "created ledger with signed genesis block"
                );
            }
        }
        Ok(())
    }

    /// Read the ledger, creating it first if needed.
    pub fn load(&self) -> Result<Ledger, LedgerError> {
        self.ensure_initialized()?;
        self.read_existing()
    }

    pub fn public_key(&self) -> Result<VerifyingKey, KeyError> {
        load_public_key(&self.config().public_key_path)
    }

    /// Verify `ledger` against the configured public key.
    ///
    /// A public key that cannot be loaded is reported as `unknown_key` at block 0.
    pub fn verify(&self, ledger: &Ledger) -> Result<(), ChainFault> {
        let public_key = match self.public_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(err = %e, "cannot load public key for verification");
                return Err(ChainFault::new(0, FailureReason::UnknownKey));
            }
        };
        verify_chain(ledger, &public_key).map_err(|fault| {
            warn!(index = fault.index, reason = %fault.reason, "ledger verification failed");
            fault
        })
    }

    /// Append a signed record block.
    ///
    /// Fails without writing anything if the stored chain does not verify or
    /// `(name, version)` is already registered.
    pub fn append(&self, record: RecordEntry) -> Result<Block, LedgerError> {
        self.ensure_initialized()?;
        let guard = self.store.lock()?;
        let mut ledger = self.read_existing()?;
        self.verify(&ledger)?;

        if let Some(existing) = ledger.find_record(&record.name, &record.version) {
            return Err(LedgerError::DuplicateRecord {
                name: record.name,
                version: record.version,
                index: existing.index,
            });
        }

        let signing_key = load_signing_key(&self.config().private_key_path)?;
        let body = next_body(&ledger, Entry::Record(record), utc_now_seconds());
        let block = seal_block(body, &signing_key)?;
        ledger.blocks.push(block.clone());
        self.persist(&guard, &ledger)?;

        debug!(index = block.index, block_hash = %block.block_hash, "block appended");
        Ok(block)
    }

    /// The anchor describing the current chain head.
    pub fn latest_anchor(&self) -> Result<Anchor, LedgerError> {
        self.ensure_initialized()?;
        self.store
            .read_anchor()?
            .ok_or_else(|| missing(&self.config().anchor_path))
    }

    fn persist(&self, guard: &LockGuard, ledger: &Ledger) -> Result<(), LedgerError> {
        self.store.save_locked(guard, ledger).map(|_| ())
    }

    fn read_existing(&self) -> Result<Ledger, LedgerError> {
        self.store
            .read_ledger()?
            .ok_or_else(|| missing(&self.config().ledger_path))
    }
}

fn missing(path: &Path) -> LedgerError {
    LedgerError::storage(path, io::Error::from(io::ErrorKind::NotFound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_keys::generate_keypair;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn engine_with_keys(dir: &TempDir) -> LedgerEngine {
        let config = LedgerConfig::rooted_at(dir.path())
            .with_lock_timeout(Duration::from_millis(200))
            .with_lock_poll_interval(Duration::from_millis(10));
        generate_keypair(&config.private_key_path, &config.public_key_path, false).unwrap();
        LedgerEngine::new(config)
    }

    fn record(name: &str, version: &str) -> RecordEntry {
        RecordEntry {
            name: name.to_string(),
            version: version.to_string(),
            file_sha256: "cd".repeat(32),
            file_size_bytes: 42,
            original_filename: format!("{name}-{version}.tar.gz"),
        }
    }

    #[test]
    fn test_load_creates_signed_genesis() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);

        let ledger = engine.load().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.blocks[0].entry, Entry::Genesis {});
        assert!(ledger.blocks[0].signature.is_some());
        assert_eq!(engine.verify(&ledger), Ok(()));
        assert_eq!(engine.latest_anchor().unwrap().latest_index, 0);
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);
        engine.ensure_initialized().unwrap();
        let first = engine.load().unwrap();
        engine.ensure_initialized().unwrap();
        assert_eq!(engine.load().unwrap(), first);
    }

    #[test]
    fn test_missing_anchor_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);
        engine.append(record("pkg", "1.0.0")).unwrap();
        let before = engine.latest_anchor().unwrap();

        fs::remove_file(&engine.config().anchor_path).unwrap();
        engine.ensure_initialized().unwrap();
        assert_eq!(engine.latest_anchor().unwrap(), before);
    }

    #[test]
    fn test_append_links_and_updates_anchor() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);

        let first = engine.append(record("pkg", "1.0.0")).unwrap();
        let second = engine.append(record("pkg", "1.0.1")).unwrap();

        assert_eq!(first.index, 1);
        assert_eq!(second.index, 2);
        assert_eq!(second.prev_hash, first.block_hash);

        let anchor = engine.latest_anchor().unwrap();
        assert_eq!(anchor.latest_index, 2);
        assert_eq!(anchor.block_hash, second.block_hash);
        assert!(!engine.config().lock_path.exists());
    }

    #[test]
    fn test_duplicate_record_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);
        engine.append(record("pkg", "1.0.0")).unwrap();

        let err = engine.append(record("pkg", "1.0.0")).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::DuplicateRecord { index: 1, .. }
        ));
        assert_eq!(engine.load().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_private_key_fails_initialization() {
        let dir = TempDir::new().unwrap();
        let engine = LedgerEngine::new(LedgerConfig::rooted_at(dir.path()));
        assert!(matches!(
            engine.load(),
            Err(LedgerError::Key(KeyError::Format { .. }))
        ));
        assert!(!engine.config().ledger_path.exists());
        assert!(!engine.config().lock_path.exists());
    }

    #[test]
    fn test_missing_public_key_is_unknown_key() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_keys(&dir);
        let ledger = engine.load().unwrap();
        fs::remove_file(&engine.config().public_key_path).unwrap();

        assert_eq!(
            engine.verify(&ledger),
            Err(ChainFault::new(0, FailureReason::UnknownKey))
        );
    }
}
