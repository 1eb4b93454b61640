//! Upgrade of unsigned v0.1 ledgers to the signed v0.2 format.
//!
//! Only record entries survive a migration. The chain is rebuilt from a fresh
//! genesis and every block is re-hashed and signed with the configured key, so
//! v0.1 block hashes never carry over.

mod legacy;
mod migrate;

pub use migrate::{migrate_v01_to_v02, MigrationSummary, DEFAULT_SOURCE, LEGACY_SCHEMA_VERSION};

use cr_ledger::LedgerError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while migrating a ledger.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(
        "{} is not a v0.1 ledger (schema_version {})",
        .path.display(),
        .found.as_deref().unwrap_or("missing")
    )]
    SourceVersionMismatch {
        path: PathBuf,
        found: Option<String>,
    },

    #[error("destination ledger {} already exists; pass overwrite to replace it", .0.display())]
    DestinationExists(PathBuf),

    #[error("failed to read source ledger {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed source ledger {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
