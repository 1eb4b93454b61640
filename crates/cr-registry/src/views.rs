//! Serializable results handed back to a request layer.

use cr_ledger::{Block, ChainFault, RecordEntry};
use serde::Serialize;
use std::fmt;

/// How `verify_record` chose its candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Look up `(name, version)` and compare its hash with the upload.
    NameVersionSha,
    /// Take the first record whose hash equals the upload's.
    ShaOnly,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::NameVersionSha => "name_version_sha",
            MatchMode::ShaOnly => "sha_only",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking uploaded content against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub match_mode: MatchMode,
    pub index: u64,
    pub name: String,
    pub version: String,
    /// Hash of the uploaded content
    pub sha256: String,
    /// Hash recorded in the ledger for the candidate
    pub recorded_sha256: String,
    pub timestamp_utc: String,
    pub signing_key_id: Option<String>,
    pub signature: Option<String>,
}

/// A record block flattened for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordView {
    pub index: u64,
    pub timestamp_utc: String,
    pub name: String,
    pub version: String,
    pub sha256: String,
    pub file_size_bytes: u64,
    pub original_filename: String,
    pub signing_key_id: Option<String>,
    pub signature: Option<String>,
}

impl RecordView {
    pub fn new(block: &Block, record: &RecordEntry) -> Self {
        Self {
            index: block.index,
            timestamp_utc: block.timestamp_utc.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            sha256: record.file_sha256.clone(),
            file_size_bytes: record.file_size_bytes,
            original_filename: record.original_filename.clone(),
            signing_key_id: block.signing_key_id.clone(),
            signature: block.signature.clone(),
        }
    }
}

/// Which verification stage passed. `None` means the stage was not reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifyChecks {
    pub chain_integrity_valid: Option<bool>,
    pub signature_valid: Option<bool>,
}

/// Result of a whole-ledger verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerVerifyReport {
    pub valid: bool,
    /// Block count on success, otherwise the index of the first bad block
    pub checked_blocks: u64,
    pub checks: VerifyChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ChainFault>,
}

impl LedgerVerifyReport {
    pub fn from_outcome(blocks: usize, outcome: Result<(), ChainFault>) -> Self {
        match outcome {
            Ok(()) => Self {
                valid: true,
                checked_blocks: blocks as u64,
                checks: VerifyChecks {
                    chain_integrity_valid: Some(true),
                    signature_valid: Some(true),
                },
                failure: None,
            },
            Err(fault) => {
                let checks = if fault.reason.is_signature_check() {
                    VerifyChecks {
                        chain_integrity_valid: None,
                        signature_valid: Some(false),
                    }
                } else {
                    VerifyChecks {
                        chain_integrity_valid: Some(false),
                        signature_valid: None,
                    }
                };
                Self {
                    valid: false,
                    checked_blocks: fault.index,
                    checks,
                    failure: Some(fault),
                }
            }
        }
    }
}

/// The published verification key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicKeyInfo {
    pub key_id: String,
    pub public_key_pem: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_ledger::FailureReason;
    use serde_json::json;

    #[test]
    fn test_report_for_valid_chain() {
        let report = LedgerVerifyReport::from_outcome(4, Ok(()));
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "valid": true,
                "checked_blocks": 4,
                "checks": {"chain_integrity_valid": true, "signature_valid": true},
            })
        );
    }

    #[test]
    fn test_report_splits_structural_and_signature_failures() {
        let structural = LedgerVerifyReport::from_outcome(
            5,
            Err(ChainFault::new(3, FailureReason::PrevHashMismatch)),
        );
        assert_eq!(structural.checks.chain_integrity_valid, Some(false));
        assert_eq!(structural.checks.signature_valid, None);
        assert_eq!(structural.checked_blocks, 3);

        let signature = LedgerVerifyReport::from_outcome(
            5,
            Err(ChainFault::new(2, FailureReason::SignatureInvalid)),
        );
        assert_eq!(signature.checks.chain_integrity_valid, None);
        assert_eq!(signature.checks.signature_valid, Some(false));
        assert_eq!(
            serde_json::to_value(&signature).unwrap()["failure"],
            json!({"index": 2, "reason": "signature_invalid"})
        );
    }

    #[test]
    fn test_match_mode_codes() {
        assert_eq!(
            serde_json::to_value(MatchMode::NameVersionSha).unwrap(),
            json!("name_version_sha")
        );
        assert_eq!(MatchMode::ShaOnly.to_string(), "sha_only");
    }
}
