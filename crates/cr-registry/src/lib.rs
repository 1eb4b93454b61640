//! Request-facing operations over a checksum registry.
//!
//! [`Registry`] validates input, streams uploads through SHA-256, drives the
//! ledger engine and reports every outcome to an [`AuditSink`]. Errors carry a
//! stable [`RegistryError::code`] and an [`ErrorClass`] so a transport layer can
//! map them without inspecting messages.
//!
//! # Example
//!
//! ```no_run
//! use cr_ledger::LedgerConfig;
//! use cr_registry::{NullAuditSink, Registry};
//!
//! let registry = Registry::with_audit_sink(LedgerConfig::rooted_at("."), NullAuditSink);
//! let block = registry
//!     .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
//!     .unwrap();
//! let result = registry
//!     .verify_record(Some("sample"), Some("1.0.0"), &b"abc"[..])
//!     .unwrap();
//! assert!(result.matched);
//! assert_eq!(result.index, block.index);
//! ```

mod audit;
mod error;
mod registry;
mod validate;
mod views;

pub use audit::{AuditEvent, AuditSink, AuditStatus, JsonlAuditLog, NullAuditSink};
pub use error::{ErrorClass, RegistryError};
pub use registry::Registry;
pub use validate::MAX_FIELD_CHARS;
pub use views::{
    LedgerVerifyReport, MatchMode, MatchResult, PublicKeyInfo, RecordView, VerifyChecks,
};
