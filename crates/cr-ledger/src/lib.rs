//! Signed, hash-chained ledger of registered file checksums.
//!
//! The ledger is a JSON file of blocks. Each block commits to its predecessor's
//! hash and carries an Ed25519 signature over its own hash. A derived anchor file
//! mirrors the newest block so that the chain head can be published or compared
//! out of band.
//!
//! # Example
//!
//! ```no_run
//! use cr_ledger::{LedgerConfig, LedgerEngine, RecordEntry};
//!
//! let engine = LedgerEngine::new(LedgerConfig::rooted_at("/srv/registry"));
//! let block = engine
//!     .append(RecordEntry {
//!         name: "firmware".to_string(),
//!         version: "1.4.2".to_string(),
//!         file_sha256: "aa".repeat(32),
//!         file_size_bytes: 1024,
//!         original_filename: "fw.bin".to_string(),
//!     })
//!     .unwrap();
//! assert_eq!(block.index, 1);
//!
//! let ledger = engine.load().unwrap();
//! assert!(engine.verify(&ledger).is_ok());
//! ```

mod chain;
mod config;
mod engine;
mod error;
mod store;
mod types;

pub use chain::{
    compute_block_hash, genesis_body, next_body, seal_block, utc_now_seconds, verify_chain,
};
pub use config::{ConfigError, LedgerConfig, DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT};
pub use engine::LedgerEngine;
pub use error::{ChainFault, FailureReason, LedgerError};
pub use store::{atomic_copy, atomic_write, write_json_atomic, LedgerStore, LockGuard};
pub use types::{
    Anchor, Block, BlockBody, Entry, Ledger, RecordEntry, GENESIS_PREV_HASH, HASH_ALGORITHM,
    SCHEMA_VERSION,
};
