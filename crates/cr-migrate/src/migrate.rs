use crate::legacy::LegacyLedger;
use crate::MigrateError;
use cr_keys::load_signing_key;
use cr_ledger::{
    genesis_body, next_body, seal_block, Entry, Ledger, LedgerConfig, LedgerError, LedgerStore,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const LEGACY_SCHEMA_VERSION: &str = "0.1";

/// Conventional location of a v0.1 ledger, relative to the registry root.
pub const DEFAULT_SOURCE: &str = "data/ledger_v01.json";

/// Genesis timestamp used when the source holds no records.
const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

/// Outcome of a successful migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub source: PathBuf,
    pub ledger_path: PathBuf,
    pub anchor_path: PathBuf,
    pub records_migrated: usize,
    pub latest_index: u64,
    pub latest_block_hash: String,
}

fn read_source(path: &Path) -> Result<LegacyLedger, MigrateError> {
    let text = fs::read_to_string(path).map_err(|source| MigrateError::Storage {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |source| MigrateError::Malformed {
        path: path.to_path_buf(),
        source,
    };
    let value: Value = serde_json::from_str(&text).map_err(malformed)?;

    let found = value.get("schema_version").and_then(Value::as_str);
    if found != Some(LEGACY_SCHEMA_VERSION) {
        return Err(MigrateError::SourceVersionMismatch {
            path: path.to_path_buf(),
            found: found.map(str::to_string),
        });
    }
    serde_json::from_value(value).map_err(malformed)
}

/// Rebuild the v0.1 ledger at `src` as a signed v0.2 ledger at the configured
/// ledger path, and write its anchor.
///
/// An existing destination ledger is only replaced when `overwrite` is set.
/// The destination is written under the ledger lock.
pub fn migrate_v01_to_v02<P: AsRef<Path>>(
    config: &LedgerConfig,
    src: P,
    overwrite: bool,
) -> Result<MigrationSummary, MigrateError> {
    let src = src.as_ref();
    let legacy = read_source(src)?;
    let records = legacy.records().map_err(|source| MigrateError::Malformed {
        path: src.to_path_buf(),
        source,
    })?;

    let store = LedgerStore::new(config.clone());
    let guard = store.lock()?;
    if store.ledger_exists() && !overwrite {
        return Err(MigrateError::DestinationExists(config.ledger_path.clone()));
    }

    let signing_key = load_signing_key(&config.private_key_path).map_err(LedgerError::from)?;

    let genesis_timestamp = records
        .first()
        .map(|r| r.timestamp_utc.clone())
        .unwrap_or_else(|| EPOCH_TIMESTAMP.to_string());
    let mut ledger = Ledger::new(seal_block(genesis_body(genesis_timestamp), &signing_key)?);

    for migrated in &records {
        let body = next_body(
            &ledger,
            Entry::Record(migrated.record.clone()),
            migrated.timestamp_utc.clone(),
        );
        let block = seal_block(body, &signing_key)?;
        debug!(index = block.index, name = %migrated.record.name, "migrated record");
        ledger.blocks.push(block);
    }

    let anchor = store.save_locked(&guard, &ledger)?;
    info!(
        source = %src.display(),
        records = records.len(),
        latest_index = anchor.latest_index,
        "migration complete"
    );

    Ok(MigrationSummary {
        source: src.to_path_buf(),
        ledger_path: config.ledger_path.clone(),
        anchor_path: config.anchor_path.clone(),
        records_migrated: records.len(),
        latest_index: anchor.latest_index,
        latest_block_hash: anchor.block_hash,
    })
}
