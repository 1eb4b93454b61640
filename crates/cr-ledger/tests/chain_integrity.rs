use cr_ledger::{
    seal_block, ChainFault, Entry, FailureReason, Ledger, LedgerConfig, LedgerEngine, LedgerError,
    LedgerStore, RecordEntry,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn setup() -> (TempDir, LedgerEngine) {
    let dir = TempDir::new().unwrap();
    let config = LedgerConfig::rooted_at(dir.path())
        .with_lock_timeout(Duration::from_millis(300))
        .with_lock_poll_interval(Duration::from_millis(10));
    cr_keys::generate_keypair(&config.private_key_path, &config.public_key_path, false).unwrap();
    (dir, LedgerEngine::new(config))
}

fn record(version: &str) -> RecordEntry {
    RecordEntry {
        name: "sample".to_string(),
        version: version.to_string(),
        file_sha256: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".to_string(),
        file_size_bytes: 0,
        original_filename: "empty.txt".to_string(),
    }
}

/// Engine with a genesis block and `n` record blocks.
fn populated(n: usize) -> (TempDir, LedgerEngine, Ledger) {
    let (dir, engine) = setup();
    for i in 0..n {
        engine.append(record(&format!("1.0.{i}"))).unwrap();
    }
    let ledger = engine.load().unwrap();
    (dir, engine, ledger)
}

fn fault(index: u64, reason: FailureReason) -> Result<(), ChainFault> {
    Err(ChainFault::new(index, reason))
}

#[test]
fn test_fresh_ledgers_verify() {
    for n in [0, 1, 4] {
        let (_dir, engine, ledger) = populated(n);
        assert_eq!(ledger.len(), n + 1);
        assert_eq!(engine.verify(&ledger), Ok(()));
    }
}

#[test]
fn test_single_field_tampering_is_localized() {
    let (_dir, engine, ledger) = populated(3);

    let cases: Vec<(&str, Box<dyn Fn(&mut Ledger)>, Result<(), ChainFault>)> = vec![
        (
            "record name",
            Box::new(|l: &mut Ledger| {
                if let Entry::Record(r) = &mut l.blocks[2].entry {
                    r.name = "evil".to_string();
                }
            }),
            fault(2, FailureReason::BlockHashMismatch),
        ),
        (
            "file hash",
            Box::new(|l: &mut Ledger| {
                if let Entry::Record(r) = &mut l.blocks[1].entry {
                    r.file_sha256 = "00".repeat(32);
                }
            }),
            fault(1, FailureReason::BlockHashMismatch),
        ),
        (
            "file size",
            Box::new(|l: &mut Ledger| {
                if let Entry::Record(r) = &mut l.blocks[3].entry {
                    r.file_size_bytes += 1;
                }
            }),
            fault(3, FailureReason::BlockHashMismatch),
        ),
        (
            "timestamp",
            Box::new(|l: &mut Ledger| l.blocks[1].timestamp_utc = "1999-01-01T00:00:00Z".to_string()),
            fault(1, FailureReason::BlockHashMismatch),
        ),
        (
            "index",
            Box::new(|l: &mut Ledger| l.blocks[2].index = 9),
            fault(2, FailureReason::IndexMismatch),
        ),
        (
            "stored block hash",
            Box::new(|l: &mut Ledger| l.blocks[3].block_hash = "ab".repeat(32)),
            fault(3, FailureReason::BlockHashMismatch),
        ),
        (
            "prev hash",
            Box::new(|l: &mut Ledger| l.blocks[2].prev_hash = "ab".repeat(32)),
            fault(2, FailureReason::BlockHashMismatch),
        ),
        (
            "signature removed",
            Box::new(|l: &mut Ledger| l.blocks[1].signature = None),
            fault(1, FailureReason::SignatureMissing),
        ),
        (
            "key id removed",
            Box::new(|l: &mut Ledger| l.blocks[3].signing_key_id = None),
            fault(3, FailureReason::SignatureMissing),
        ),
        (
            "key id replaced",
            Box::new(|l: &mut Ledger| l.blocks[2].signing_key_id = Some("ffffffffffffffff".to_string())),
            fault(2, FailureReason::UnknownKey),
        ),
        (
            "genesis prev hash",
            Box::new(|l: &mut Ledger| l.blocks[0].prev_hash = "11".repeat(32)),
            fault(0, FailureReason::InvalidGenesis),
        ),
        (
            "block removed",
            Box::new(|l: &mut Ledger| {
                l.blocks.remove(2);
            }),
            fault(2, FailureReason::IndexMismatch),
        ),
    ];

    for (label, tamper, expected) in cases {
        let mut tampered = ledger.clone();
        tamper(&mut tampered);
        assert_eq!(engine.verify(&tampered), expected, "tampered field: {label}");
    }
}

#[test]
fn test_signature_flip_at_block_two() {
    let (_dir, engine, mut ledger) = populated(3);

    let signature = ledger.blocks[2].signature.take().unwrap();
    let mut chars: Vec<char> = signature.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    ledger.blocks[2].signature = Some(chars.into_iter().collect());

    assert_eq!(
        engine.verify(&ledger),
        fault(2, FailureReason::SignatureInvalid)
    );
}

#[test]
fn test_append_refuses_corrupt_chain() {
    let (_dir, engine, mut ledger) = populated(2);
    if let Entry::Record(r) = &mut ledger.blocks[1].entry {
        r.version = "6.6.6".to_string();
    }
    LedgerStore::new(engine.config().clone()).save(&ledger).unwrap();

    let err = engine.append(record("2.0.0")).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ChainInvalid(ChainFault {
            index: 1,
            reason: FailureReason::BlockHashMismatch
        })
    ));
    assert_eq!(engine.load().unwrap(), ledger);
}

#[test]
fn test_append_postconditions() {
    let (_dir, engine, before) = populated(2);

    let block = engine.append(record("9.9.9")).unwrap();
    let after = engine.load().unwrap();

    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after.blocks[..before.len()], before.blocks[..]);
    assert_eq!(after.latest(), Some(&block));
    assert_eq!(block.index, before.len() as u64);
    assert_eq!(block.prev_hash, before.latest().unwrap().block_hash);
    assert_eq!(engine.verify(&after), Ok(()));

    let anchor = engine.latest_anchor().unwrap();
    assert_eq!(anchor.latest_index, block.index);
    assert_eq!(anchor.block_hash, block.block_hash);
    assert_eq!(anchor.signature, block.signature.clone().unwrap());
    assert_eq!(anchor.ledger_path, "data/ledger.json");
}

#[test]
fn test_save_load_roundtrip_preserves_blocks() {
    let (_dir, engine, ledger) = populated(3);
    let store = engine.store();
    store.save(&ledger).unwrap();
    assert_eq!(store.read_ledger().unwrap(), Some(ledger.clone()));

    let text = fs::read_to_string(&engine.config().ledger_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["schema_version"], "0.2");
    assert_eq!(value["signature_algorithm"], "ed25519");
    assert_eq!(value["canonical_json"], "JCS-STRICT");
    assert_eq!(value["blocks"][1]["entry"]["type"], "record");
}

#[test]
fn test_rotated_key_reports_unknown_key() {
    let (_dir, engine, ledger) = populated(1);
    let config = engine.config();
    cr_keys::generate_keypair(&config.private_key_path, &config.public_key_path, true).unwrap();

    assert_eq!(engine.verify(&ledger), fault(0, FailureReason::UnknownKey));
    assert!(matches!(
        engine.append(record("3.0.0")),
        Err(LedgerError::ChainInvalid(ChainFault {
            index: 0,
            reason: FailureReason::UnknownKey
        }))
    ));
}

#[test]
fn test_resealed_block_with_foreign_key_is_unknown_key() {
    let (_dir, engine, mut ledger) = populated(2);
    let foreign = cr_keys::SigningKey::from_bytes(&[3u8; 32]);
    ledger.blocks[2] = seal_block(ledger.blocks[2].body(), &foreign).unwrap();

    assert_eq!(engine.verify(&ledger), fault(2, FailureReason::UnknownKey));
}

#[test]
fn test_append_times_out_while_lock_is_held() {
    let (_dir, engine, ledger) = populated(1);
    let guard = engine.store().lock().unwrap();

    let err = engine.append(record("5.0.0")).unwrap_err();
    assert!(matches!(err, LedgerError::LockTimeout { .. }));
    assert!(err.is_retryable());
    drop(guard);
    assert_eq!(engine.load().unwrap(), ledger);
}
