//! Point-in-time snapshots of the registry files, and verified restore.
//!
//! A snapshot is a timestamped directory holding copies of the ledger, anchor,
//! public key and audit log at their root-relative paths, plus a
//! `manifest.json` listing the SHA-256 and size of every copied file. The
//! private key is never copied.

mod manifest;
mod restore;
mod snapshot;

pub use manifest::{verify_backup, Manifest, MANIFEST_FILE};
pub use restore::{restore, RestoreReport};
pub use snapshot::snapshot;

use cr_ledger::{ChainFault, LedgerError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by snapshot and restore.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("nothing to back up: ledger {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("backup manifest {} not found", .0.display())]
    ManifestMissing(PathBuf),

    #[error("backup does not contain a ledger at {}", .0.display())]
    LedgerMissing(PathBuf),

    #[error("backup file {path} does not match its manifest entry")]
    ManifestMismatch { path: String },

    #[error("backup file {path} listed in the manifest is missing")]
    ManifestEntryMissing { path: String },

    #[error(
        "restored ledger failed verification at block {}: {}",
        .0.index,
        .0.reason
    )]
    RestoreVerificationFailed(ChainFault),

    #[error("backup I/O error on {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl BackupError {
    fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BackupError::Storage {
            path: path.into(),
            source,
        }
    }
}
