use crate::audit::{AuditSink, AuditStatus, JsonlAuditLog};
use crate::validate::validate_field;
use crate::views::{LedgerVerifyReport, MatchMode, MatchResult, PublicKeyInfo, RecordView};
use crate::RegistryError;
use cr_canon::{sha256_reader, FileDigest};
use cr_keys::{key_id, public_key_pem};
use cr_ledger::{Anchor, Block, LedgerConfig, LedgerEngine, LedgerError, RecordEntry};
use serde_json::{json, Value};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Operations a request layer exposes over one registry.
///
/// Every call records exactly one audit event, on success and on failure.
pub struct Registry {
    engine: LedgerEngine,
    audit: Box<dyn AuditSink>,
}

impl Registry {
    /// Registry auditing to the configured JSON-lines log.
    pub fn new(config: LedgerConfig) -> Self {
        let audit = JsonlAuditLog::new(&config.audit_log_path);
        Self::with_audit_sink(config, audit)
    }

    pub fn with_audit_sink(config: LedgerConfig, audit: impl AuditSink + 'static) -> Self {
        Self {
            engine: LedgerEngine::new(config),
            audit: Box::new(audit),
        }
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Hash `content` and append a record block for it.
    ///
    /// `(name, version)` must not already be registered, whatever the content.
    pub fn register_record<R: Read>(
        &self,
        name: &str,
        version: &str,
        original_filename: &str,
        content: R,
    ) -> Result<Block, RegistryError> {
        let result = self.register_inner(name, version, original_filename, content);
        self.finish(
            "register_record",
            json!({"name": name, "version": version, "original_filename": original_filename}),
            result,
            |block| {
                json!({
                    "index": block.index,
                    "block_hash": block.block_hash,
                    "sha256": block.record().map(|r| r.file_sha256.as_str()),
                })
            },
        )
    }

    /// Like [`Registry::register_record`], rewinding `content` to its start
    /// before and after hashing so the caller can reuse it.
    ///
    /// A failed rewind after the block is appended is logged and the block is
    /// still returned, since the record is already in the ledger.
    pub fn register_record_seekable<R: Read + Seek>(
        &self,
        name: &str,
        version: &str,
        original_filename: &str,
        content: &mut R,
    ) -> Result<Block, RegistryError> {
        if let Err(e) = content.seek(SeekFrom::Start(0)) {
            let result = Err(RegistryError::Upload(e));
            return self.finish(
                "register_record",
                json!({"name": name, "version": version}),
                result,
                |_: &Block| Value::Null,
            );
        }
        let block = self.register_record(name, version, original_filename, &mut *content)?;
        if let Err(e) = content.seek(SeekFrom::Start(0)) {
            warn!(index = block.index, error = %e, "failed to rewind upload after registering");
        }
        Ok(block)
    }

    fn register_inner<R: Read>(
        &self,
        name: &str,
        version: &str,
        original_filename: &str,
        content: R,
    ) -> Result<Block, RegistryError> {
        validate_field("name", name)?;
        validate_field("version", version)?;
        validate_field("original_filename", original_filename)?;

        // Checked again by the engine under the lock.
        let ledger = self.engine.load()?;
        if let Some(existing) = ledger.find_record(name, version) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
                version: version.to_string(),
                index: existing.index,
            });
        }

        let digest = hash_upload(content)?;
        debug!(name, version, sha256 = %digest.sha256, "upload hashed");
        let block = self.engine.append(RecordEntry {
            name: name.to_string(),
            version: version.to_string(),
            file_sha256: digest.sha256,
            file_size_bytes: digest.size_bytes,
            original_filename: original_filename.to_string(),
        })?;
        Ok(block)
    }

    /// Check uploaded content against the ledger.
    ///
    /// With both `name` and `version` the named record is compared and a content
    /// difference yields `matched == false`. Otherwise the first record with the
    /// same hash is returned. No candidate at all is [`RegistryError::NotFound`].
    pub fn verify_record<R: Read>(
        &self,
        name: Option<&str>,
        version: Option<&str>,
        content: R,
    ) -> Result<MatchResult, RegistryError> {
        let result = self.verify_record_inner(name, version, content);
        self.finish(
            "verify_record",
            json!({"name": name, "version": version}),
            result,
            |m| {
                json!({
                    "matched": m.matched,
                    "match_mode": m.match_mode,
                    "index": m.index,
                    "sha256": m.sha256,
                })
            },
        )
    }

    fn verify_record_inner<R: Read>(
        &self,
        name: Option<&str>,
        version: Option<&str>,
        content: R,
    ) -> Result<MatchResult, RegistryError> {
        let target = match (name, version) {
            (Some(name), Some(version)) => {
                validate_field("name", name)?;
                validate_field("version", version)?;
                Some((name, version))
            }
            _ => None,
        };

        let ledger = self.engine.load()?;
        self.engine.verify(&ledger).map_err(LedgerError::from)?;
        let digest = hash_upload(content)?;

        let (mode, found) = match target {
            Some((name, version)) => (
                MatchMode::NameVersionSha,
                ledger
                    .find_record(name, version)
                    .and_then(|block| block.record().map(|record| (block, record))),
            ),
            None => (
                MatchMode::ShaOnly,
                ledger
                    .records()
                    .find(|(_, record)| record.file_sha256 == digest.sha256),
            ),
        };

        let (block, record) = found.ok_or_else(|| {
            RegistryError::NotFound(match target {
                Some((name, version)) => format!("{name} {version} is not registered"),
                None => format!("no record has sha256 {}", digest.sha256),
            })
        })?;

        Ok(MatchResult {
            matched: record.file_sha256 == digest.sha256,
            match_mode: mode,
            index: block.index,
            name: record.name.clone(),
            version: record.version.clone(),
            sha256: digest.sha256,
            recorded_sha256: record.file_sha256.clone(),
            timestamp_utc: block.timestamp_utc.clone(),
            signing_key_id: block.signing_key_id.clone(),
            signature: block.signature.clone(),
        })
    }

    /// Every record in chain order.
    pub fn list_records(&self) -> Result<Vec<RecordView>, RegistryError> {
        let result = self
            .engine
            .load()
            .map(|ledger| {
                ledger
                    .records()
                    .map(|(block, record)| RecordView::new(block, record))
                    .collect::<Vec<_>>()
            })
            .map_err(RegistryError::from);
        self.finish("list_records", json!({}), result, |items| {
            json!({"count": items.len()})
        })
    }

    /// Verify the whole chain.
    ///
    /// An invalid chain is a normal report, not an error; errors are reserved
    /// for failing to read the ledger at all.
    pub fn verify_ledger(&self) -> Result<LedgerVerifyReport, RegistryError> {
        let report = match self.engine.load() {
            Ok(ledger) => {
                LedgerVerifyReport::from_outcome(ledger.len(), self.engine.verify(&ledger))
            }
            Err(e) => return self.finish("verify_ledger", json!({}), Err(e.into()), |_| Value::Null),
        };

        let status = if report.valid {
            AuditStatus::Success
        } else {
            AuditStatus::Failure
        };
        let details = serde_json::to_value(&report).unwrap_or(Value::Null);
        self.audit.record("verify_ledger", status, details);
        Ok(report)
    }

    pub fn public_key_info(&self) -> Result<PublicKeyInfo, RegistryError> {
        let result = self.public_key_inner();
        self.finish("public_key", json!({}), result, |info| {
            json!({"key_id": info.key_id})
        })
    }

    fn public_key_inner(&self) -> Result<PublicKeyInfo, RegistryError> {
        let public_key = self.engine.public_key()?;
        Ok(PublicKeyInfo {
            key_id: key_id(&public_key)?,
            public_key_pem: public_key_pem(&public_key)?,
        })
    }

    pub fn latest_anchor(&self) -> Result<Anchor, RegistryError> {
        let result = self.engine.latest_anchor().map_err(RegistryError::from);
        self.finish("latest_anchor", json!({}), result, |anchor| {
            json!({"latest_index": anchor.latest_index})
        })
    }

    /// Emit the audit event for an outcome and hand the outcome back.
    fn finish<T>(
        &self,
        action: &str,
        context: Value,
        result: Result<T, RegistryError>,
        summarize: impl FnOnce(&T) -> Value,
    ) -> Result<T, RegistryError> {
        match &result {
            Ok(value) => {
                self.audit
                    .record(action, AuditStatus::Success, merge(context, summarize(value)));
            }
            Err(err) => {
                let error = json!({"error": {"code": err.code(), "message": err.to_string()}});
                self.audit
                    .record(action, AuditStatus::Failure, merge(context, error));
            }
        }
        result
    }
}

fn hash_upload<R: Read>(content: R) -> Result<FileDigest, RegistryError> {
    sha256_reader(content).map_err(RegistryError::Upload)
}

fn merge(mut base: Value, extra: Value) -> Value {
    match (&mut base, extra) {
        (Value::Object(base), Value::Object(extra)) => base.extend(extra),
        (_, Value::Null) => {}
        (_, extra) => return extra,
    }
    base
}
