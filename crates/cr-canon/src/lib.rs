//! Canonical JSON encoding and SHA-256 digests for the checksum registry.
//!
//! Everything that gets hashed or signed by the ledger passes through [`encode`]:
//! object keys sorted by code point, compact separators, UTF-8 output with no
//! escaping of non-ASCII text. Any change to this byte layout breaks every
//! existing ledger.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//!
//! let bytes = cr_canon::encode(&json!({"b": 1, "a": "é"}));
//! assert_eq!(bytes, "{\"a\":\"é\",\"b\":1}".as_bytes());
//! ```

mod digest;
mod encode;

pub use digest::{sha256_file, sha256_hex, sha256_reader, FileDigest, CHUNK_SIZE};
pub use encode::{encode, encode_value, CanonError};

/// Label recorded in ledger headers for this encoding.
pub const CANONICAL_JSON_LABEL: &str = "JCS-STRICT";
