use cr_keys::KeyError;
use cr_ledger::LedgerError;
use serde::Serialize;
use std::io;
use thiserror::Error;

/// Coarse outcome class a request layer maps to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    BadInput,
    NotFound,
    Conflict,
    Internal,
}

/// Errors returned by [`crate::Registry`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    #[error("{name} {version} is already registered at block {index}")]
    Duplicate {
        name: String,
        version: String,
        index: u64,
    },

    #[error("no matching record: {0}")]
    NotFound(String),

    #[error("failed to read uploaded content: {0}")]
    Upload(#[source] io::Error),

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for RegistryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateRecord {
                name,
                version,
                index,
            } => RegistryError::Duplicate {
                name,
                version,
                index,
            },
            other => RegistryError::Ledger(other),
        }
    }
}

impl From<KeyError> for RegistryError {
    fn from(err: KeyError) -> Self {
        RegistryError::Ledger(LedgerError::Key(err))
    }
}

impl RegistryError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Validation { .. } => "validation_error",
            RegistryError::Duplicate { .. } => "duplicate",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::Upload(_) => "upload_read_error",
            RegistryError::Ledger(err) => match err {
                LedgerError::Storage { .. }
                | LedgerError::Malformed { .. }
                | LedgerError::Serialize(_) => "storage_error",
                LedgerError::ChainInvalid(_) => "chain_invalid",
                LedgerError::LockTimeout { .. } => "lock_timeout",
                LedgerError::DuplicateRecord { .. } => "duplicate",
                LedgerError::Key(KeyError::Format { .. }) => "key_format_error",
                LedgerError::Key(KeyError::InsecurePermissions { .. }) => "insecure_permissions",
                LedgerError::Key(KeyError::InvalidHash(_)) => "invalid_hash",
                LedgerError::Key(_) => "key_error",
                LedgerError::Canon(_) => "internal_error",
            },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryError::Validation { .. } | RegistryError::Upload(_) => ErrorClass::BadInput,
            RegistryError::NotFound(_) => ErrorClass::NotFound,
            RegistryError::Duplicate { .. }
            | RegistryError::Ledger(LedgerError::DuplicateRecord { .. }) => ErrorClass::Conflict,
            RegistryError::Ledger(_) => ErrorClass::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Ledger(err) if err.is_retryable())
    }
}
