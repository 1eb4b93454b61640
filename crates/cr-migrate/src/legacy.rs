//! Lenient reader for v0.1 ledgers.
//!
//! v0.1 files were written without a strict schema, so only the fields needed
//! to rebuild records are required and everything else is ignored.

use cr_ledger::RecordEntry;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyLedger {
    #[serde(default)]
    pub blocks: Vec<LegacyBlock>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyBlock {
    pub timestamp_utc: String,
    #[serde(default)]
    pub entry: Value,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    name: String,
    version: String,
    file_sha256: String,
    file_size_bytes: u64,
    original_filename: String,
}

/// A record taken from a v0.1 block, with the block's timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MigratedRecord {
    pub timestamp_utc: String,
    pub record: RecordEntry,
}

impl LegacyLedger {
    /// Record entries in chain order. Genesis and unknown entry kinds are dropped.
    pub fn records(&self) -> Result<Vec<MigratedRecord>, serde_json::Error> {
        let mut out = Vec::new();
        for block in &self.blocks {
            if block.entry.get("type").and_then(Value::as_str) != Some("record") {
                continue;
            }
            let legacy: LegacyRecord = serde_json::from_value(block.entry.clone())?;
            out.push(MigratedRecord {
                timestamp_utc: block.timestamp_utc.clone(),
                record: RecordEntry {
                    name: legacy.name,
                    version: legacy.version,
                    file_sha256: legacy.file_sha256,
                    file_size_bytes: legacy.file_size_bytes,
                    original_filename: legacy.original_filename,
                },
            });
        }
        Ok(out)
    }
}
