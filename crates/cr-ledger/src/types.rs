//! Ledger data structures.

use serde::{Deserialize, Serialize};

/// Format version written by this crate.
pub const SCHEMA_VERSION: &str = "0.2";

pub const HASH_ALGORITHM: &str = "sha256";

/// `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A registered file version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEntry {
    pub name: String,
    pub version: String,
    /// Lowercase hex SHA-256 of the file content
    pub file_sha256: String,
    pub file_size_bytes: u64,
    /// File name as supplied at registration, for human reference only
    pub original_filename: String,
}

/// Payload of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Entry {
    Genesis {},
    Record(RecordEntry),
}

impl Entry {
    pub fn as_record(&self) -> Option<&RecordEntry> {
        match self {
            Entry::Record(record) => Some(record),
            Entry::Genesis {} => None,
        }
    }
}

/// The hashed part of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockBody {
    pub index: u64,
    pub timestamp_utc: String,
    pub prev_hash: String,
    pub entry: Entry,
}

/// A single link in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub index: u64,
    /// UTC, second precision, `Z` suffix
    pub timestamp_utc: String,
    pub prev_hash: String,
    pub entry: Entry,
    /// SHA-256 of the canonical encoding of the body
    pub block_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_id: Option<String>,
    /// Base64 Ed25519 signature over the raw bytes of `block_hash`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Block {
    /// Copy out the fields covered by `block_hash`.
    pub fn body(&self) -> BlockBody {
        BlockBody {
            index: self.index,
            timestamp_utc: self.timestamp_utc.clone(),
            prev_hash: self.prev_hash.clone(),
            entry: self.entry.clone(),
        }
    }

    pub fn record(&self) -> Option<&RecordEntry> {
        self.entry.as_record()
    }
}

/// The persisted ledger document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ledger {
    pub schema_version: String,
    pub hash_algorithm: String,
    /// Absent in unsigned legacy ledgers
    #[serde(default)]
    pub signature_algorithm: String,
    pub canonical_json: String,
    pub blocks: Vec<Block>,
}

impl Ledger {
    /// Create a current-format ledger holding only `genesis`.
    pub fn new(genesis: Block) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            hash_algorithm: HASH_ALGORITHM.to_string(),
            signature_algorithm: cr_keys::SIGNATURE_ALGORITHM.to_string(),
            canonical_json: cr_canon::CANONICAL_JSON_LABEL.to_string(),
            blocks: vec![genesis],
        }
    }

    pub fn latest(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Record blocks in chain order.
    pub fn records(&self) -> impl Iterator<Item = (&Block, &RecordEntry)> {
        self.blocks
            .iter()
            .filter_map(|block| block.record().map(|record| (block, record)))
    }

    /// Find the block registering `name` at `version`.
    pub fn find_record(&self, name: &str, version: &str) -> Option<&Block> {
        self.records()
            .find(|(_, record)| record.name == name && record.version == version)
            .map(|(block, _)| block)
    }
}

/// Summary of the chain head, rewritten after every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub schema_version: String,
    pub ledger_path: String,
    pub latest_index: u64,
    pub block_hash: String,
    pub timestamp_utc: String,
    pub signing_key_id: String,
    pub signature: String,
}

impl Anchor {
    pub fn for_block(ledger_path: String, block: &Block) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            ledger_path,
            latest_index: block.index,
            block_hash: block.block_hash.clone(),
            timestamp_utc: block.timestamp_utc.clone(),
            signing_key_id: block.signing_key_id.clone().unwrap_or_default(),
            signature: block.signature.clone().unwrap_or_default(),
        }
    }
}
