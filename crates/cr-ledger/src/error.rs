//! Ledger error types and chain verification reason codes.

use cr_canon::CanonError;
use cr_keys::KeyError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why chain verification stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidGenesis,
    IndexMismatch,
    BlockHashMismatch,
    PrevHashMismatch,
    SignatureMissing,
    UnknownKey,
    SignatureInvalid,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidGenesis => "invalid_genesis",
            FailureReason::IndexMismatch => "index_mismatch",
            FailureReason::BlockHashMismatch => "block_hash_mismatch",
            FailureReason::PrevHashMismatch => "prev_hash_mismatch",
            FailureReason::SignatureMissing => "signature_missing",
            FailureReason::UnknownKey => "unknown_key",
            FailureReason::SignatureInvalid => "signature_invalid",
        }
    }

    /// True for the checks that concern signatures rather than chain structure.
    pub fn is_signature_check(&self) -> bool {
        matches!(
            self,
            FailureReason::SignatureMissing
                | FailureReason::UnknownKey
                | FailureReason::SignatureInvalid
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First invariant violation found in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error("chain invalid at block {index}: {reason}")]
pub struct ChainFault {
    pub index: u64,
    pub reason: FailureReason,
}

impl ChainFault {
    pub fn new(index: u64, reason: FailureReason) -> Self {
        Self { index, reason }
    }
}

/// Errors raised by the ledger engine and its store.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error on {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed ledger data in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize ledger data: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    ChainInvalid(#[from] ChainFault),

    #[error(
        "timed out after {}ms waiting for ledger lock {}",
        .waited.as_millis(),
        .path.display()
    )]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("record {name} {version} is already registered at block {index}")]
    DuplicateRecord {
        name: String,
        version: String,
        index: u64,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Canon(#[from] CanonError),
}

impl LedgerError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LedgerError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockTimeout { .. })
    }
}
