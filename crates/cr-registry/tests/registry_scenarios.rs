use cr_ledger::{Entry, FailureReason, LedgerConfig, LedgerStore};
use cr_registry::{
    AuditEvent, AuditSink, AuditStatus, ErrorClass, MatchMode, Registry, RegistryError,
};
use serde_json::Value;
use std::fs;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<(String, AuditStatus, Value)>>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<(String, AuditStatus, Value)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, action: &str, status: AuditStatus, details: Value) {
        self.events
            .lock()
            .unwrap()
            .push((action.to_string(), status, details));
    }
}

fn setup() -> (TempDir, Registry, RecordingSink) {
    let dir = TempDir::new().unwrap();
    let config = LedgerConfig::rooted_at(dir.path());
    cr_keys::generate_keypair(&config.private_key_path, &config.public_key_path, false).unwrap();
    let sink = RecordingSink::default();
    let registry = Registry::with_audit_sink(config, sink.clone());
    (dir, registry, sink)
}

const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

#[test]
fn test_register_then_verify() {
    let (_dir, registry, sink) = setup();

    let block = registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap();
    assert_eq!(block.index, 1);
    let record = block.record().unwrap();
    assert_eq!(record.file_sha256, ABC_SHA256);
    assert_eq!(record.file_size_bytes, 3);

    let result = registry
        .verify_record(Some("sample"), Some("1.0.0"), &b"abc"[..])
        .unwrap();
    assert!(result.matched);
    assert_eq!(result.match_mode, MatchMode::NameVersionSha);
    assert_eq!(result.index, 1);
    assert_eq!(result.signature, block.signature);

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "register_record");
    assert_eq!(events[0].1, AuditStatus::Success);
    assert_eq!(events[0].2["index"], 1);
    assert_eq!(events[1].0, "verify_record");
}

#[test]
fn test_duplicate_is_rejected_regardless_of_content() {
    let (_dir, registry, sink) = setup();
    registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap();

    let err = registry
        .register_record("sample", "1.0.0", "b.bin", &b"different"[..])
        .unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate { index: 1, .. }));
    assert_eq!(err.code(), "duplicate");
    assert_eq!(err.class(), ErrorClass::Conflict);

    assert_eq!(registry.list_records().unwrap().len(), 1);
    let events = sink.take();
    let failure = &events[1];
    assert_eq!(failure.1, AuditStatus::Failure);
    assert_eq!(failure.2["error"]["code"], "duplicate");
    assert_eq!(failure.2["name"], "sample");
}

#[test]
fn test_validation_failures_are_bad_input_and_audited() {
    let (_dir, registry, sink) = setup();
    let long = "v".repeat(257);
    let cases = [
        ("", "1.0.0", "a.bin"),
        ("sample", long.as_str(), "a.bin"),
        ("sample", "1.0.0", "bad\nname"),
    ];
    for (name, version, filename) in cases {
        let err = registry
            .register_record(name, version, filename, &b"abc"[..])
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.class(), ErrorClass::BadInput);
    }
    let events = sink.take();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.1 == AuditStatus::Failure));
}

#[test]
fn test_content_mismatch_and_sha_only_mode() {
    let (_dir, registry, _sink) = setup();
    registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap();
    registry
        .register_record("other", "2.0.0", "b.bin", &b"xyz"[..])
        .unwrap();

    let mismatch = registry
        .verify_record(Some("sample"), Some("1.0.0"), &b"abd"[..])
        .unwrap();
    assert!(!mismatch.matched);
    assert_eq!(mismatch.recorded_sha256, ABC_SHA256);

    let by_hash = registry.verify_record(None, None, &b"xyz"[..]).unwrap();
    assert!(by_hash.matched);
    assert_eq!(by_hash.match_mode, MatchMode::ShaOnly);
    assert_eq!(by_hash.name, "other");
    assert_eq!(by_hash.index, 2);

    // A lone name still searches by content.
    let partial = registry
        .verify_record(Some("sample"), None, &b"abc"[..])
        .unwrap();
    assert_eq!(partial.match_mode, MatchMode::ShaOnly);
    assert_eq!(partial.index, 1);
}

#[test]
fn test_verify_record_not_found() {
    let (_dir, registry, _sink) = setup();
    registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap();

    let missing_version = registry
        .verify_record(Some("sample"), Some("9.9.9"), &b"abc"[..])
        .unwrap_err();
    assert!(matches!(missing_version, RegistryError::NotFound(_)));
    assert_eq!(missing_version.class(), ErrorClass::NotFound);

    let unknown_content = registry
        .verify_record(None, None, &b"never registered"[..])
        .unwrap_err();
    assert_eq!(unknown_content.code(), "not_found");
}

#[test]
fn test_tampered_ledger_fails_verification_and_registration() {
    let (_dir, registry, sink) = setup();
    for version in ["1", "2", "3"] {
        registry
            .register_record("sample", version, "a.bin", version.as_bytes())
            .unwrap();
    }
    let store = LedgerStore::new(registry.engine().config().clone());
    let mut ledger = store.read_ledger().unwrap().unwrap();
    if let Entry::Record(r) = &mut ledger.blocks[2].entry {
        r.file_sha256 = "00".repeat(32);
    }
    store.save(&ledger).unwrap();
    sink.take();

    let report = registry.verify_ledger().unwrap();
    assert!(!report.valid);
    assert_eq!(report.checked_blocks, 2);
    assert_eq!(report.checks.chain_integrity_valid, Some(false));
    assert_eq!(report.checks.signature_valid, None);
    assert_eq!(
        report.failure.map(|f| f.reason),
        Some(FailureReason::BlockHashMismatch)
    );

    let err = registry
        .register_record("sample", "4", "a.bin", &b"4"[..])
        .unwrap_err();
    assert_eq!(err.code(), "chain_invalid");
    let err = registry.verify_record(None, None, &b"1"[..]).unwrap_err();
    assert_eq!(err.code(), "chain_invalid");

    let statuses: Vec<AuditStatus> = sink.take().into_iter().map(|e| e.1).collect();
    assert_eq!(statuses, vec![AuditStatus::Failure; 3]);
}

#[test]
fn test_fresh_ledger_report_and_key_info() {
    let (_dir, registry, _sink) = setup();

    let report = registry.verify_ledger().unwrap();
    assert!(report.valid);
    assert_eq!(report.checked_blocks, 1);
    assert_eq!(report.checks.chain_integrity_valid, Some(true));
    assert_eq!(report.checks.signature_valid, Some(true));

    let info = registry.public_key_info().unwrap();
    assert_eq!(info.key_id.len(), 16);
    assert!(info.public_key_pem.contains("BEGIN PUBLIC KEY"));

    let anchor = registry.latest_anchor().unwrap();
    assert_eq!(anchor.latest_index, 0);
    assert_eq!(anchor.signing_key_id, info.key_id);
}

#[test]
fn test_list_records_in_chain_order() {
    let (_dir, registry, _sink) = setup();
    assert!(registry.list_records().unwrap().is_empty());
    for (name, body) in [("a", "1"), ("b", "22"), ("c", "333")] {
        registry
            .register_record(name, "1.0", &format!("{name}.txt"), body.as_bytes())
            .unwrap();
    }

    let items = registry.list_records().unwrap();
    let names: Vec<&str> = items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(items[2].file_size_bytes, 3);
    assert_eq!(items[2].index, 3);
    assert!(items.iter().all(|r| r.signature.is_some()));
}

#[test]
fn test_seekable_upload_is_rewound() {
    let (_dir, registry, _sink) = setup();
    let mut upload = Cursor::new(b"payload".to_vec());
    upload.seek(SeekFrom::End(0)).unwrap();

    let block = registry
        .register_record_seekable("pkg", "1", "p.bin", &mut upload)
        .unwrap();
    assert_eq!(block.record().unwrap().file_size_bytes, 7);

    let mut again = Vec::new();
    upload.read_to_end(&mut again).unwrap();
    assert_eq!(again, b"payload");
}

/// Upload that can be rewound a fixed number of times.
struct LimitedRewind {
    inner: Cursor<Vec<u8>>,
    seeks_left: usize,
}

impl Read for LimitedRewind {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for LimitedRewind {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.seeks_left == 0 {
            return Err(io::Error::other("stream closed"));
        }
        self.seeks_left -= 1;
        self.inner.seek(pos)
    }
}

#[test]
fn test_failed_rewind_after_append_still_returns_block() {
    let (_dir, registry, sink) = setup();
    let mut upload = LimitedRewind {
        inner: Cursor::new(b"abc".to_vec()),
        seeks_left: 1,
    };

    let block = registry
        .register_record_seekable("pkg", "1", "p.bin", &mut upload)
        .unwrap();
    assert_eq!(block.index, 1);
    assert_eq!(block.record().unwrap().file_sha256, ABC_SHA256);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1, AuditStatus::Success);
    assert_eq!(registry.list_records().unwrap().len(), 1);
}

#[test]
fn test_missing_keys_are_internal_errors() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::with_audit_sink(
        LedgerConfig::rooted_at(dir.path()),
        cr_registry::NullAuditSink,
    );
    let err = registry.list_records().unwrap_err();
    assert_eq!(err.code(), "key_format_error");
    assert_eq!(err.class(), ErrorClass::Internal);
    assert_eq!(registry.public_key_info().unwrap_err().code(), "key_format_error");
}

#[test]
fn test_default_registry_writes_jsonl_audit_log() {
    let dir = TempDir::new().unwrap();
    let config = LedgerConfig::rooted_at(dir.path());
    cr_keys::generate_keypair(&config.private_key_path, &config.public_key_path, false).unwrap();
    let registry = Registry::new(config.clone());

    registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap();
    registry
        .register_record("sample", "1.0.0", "a.bin", &b"abc"[..])
        .unwrap_err();

    let events: Vec<AuditEvent> = fs::read_to_string(&config.audit_log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "register_record");
    assert_eq!(events[0].status, AuditStatus::Success);
    assert_eq!(events[1].status, AuditStatus::Failure);
    assert_eq!(events[1].details["error"]["code"], "duplicate");
}
