//! Block hashing, sealing and whole-chain verification.

use crate::error::{ChainFault, FailureReason, LedgerError};
use crate::types::{Block, BlockBody, Entry, Ledger, GENESIS_PREV_HASH};
use chrono::Utc;
use cr_canon::{encode_value, sha256_hex, CanonError};
use cr_keys::{key_id, sign_block_hash, verify_block_hash, SigningKey, VerifyingKey};

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn utc_now_seconds() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// SHA-256 over the canonical encoding of a block body.
pub fn compute_block_hash(body: &BlockBody) -> Result<String, CanonError> {
    Ok(sha256_hex(&encode_value(body)?))
}

pub fn genesis_body(timestamp_utc: String) -> BlockBody {
    BlockBody {
        index: 0,
        timestamp_utc,
        prev_hash: GENESIS_PREV_HASH.to_string(),
        entry: Entry::Genesis {},
    }
}

/// Body of the block that would follow the ledger's current head.
pub fn next_body(ledger: &Ledger, entry: Entry, timestamp_utc: String) -> BlockBody {
    let prev_hash = ledger
        .latest()
        .map(|block| block.block_hash.clone())
        .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
    BlockBody {
        index: ledger.len() as u64,
        timestamp_utc,
        prev_hash,
        entry,
    }
}

/// Hash and sign a body, producing a complete block.
pub fn seal_block(body: BlockBody, signing_key: &SigningKey) -> Result<Block, LedgerError> {
    let block_hash = compute_block_hash(&body)?;
    let (signature, signing_key_id) = sign_block_hash(signing_key, &block_hash)?;
    Ok(Block {
        index: body.index,
        timestamp_utc: body.timestamp_utc,
        prev_hash: body.prev_hash,
        entry: body.entry,
        block_hash,
        signing_key_id: Some(signing_key_id),
        signature: Some(signature),
    })
}

fn is_valid_genesis(block: &Block) -> bool {
    block.index == 0
        && block.prev_hash == GENESIS_PREV_HASH
        && matches!(block.entry, Entry::Genesis {})
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Verify every invariant of the chain in a single pass.
///
/// Stops at the first violation. Per block the checks run in this order:
/// genesis shape (block 0 only), index, recomputed hash, link to the previous
/// block, presence of a signature, signer key id, and the signature itself.
/// Nothing stored in a block is trusted; hashes and signatures are recomputed.
pub fn verify_chain(ledger: &Ledger, public_key: &VerifyingKey) -> Result<(), ChainFault> {
    let expected_key_id =
        key_id(public_key).map_err(|_| ChainFault::new(0, FailureReason::UnknownKey))?;

    if ledger.is_empty() {
        return Err(ChainFault::new(0, FailureReason::InvalidGenesis));
    }

    let mut prev_hash: Option<&str> = None;

    for (position, block) in ledger.blocks.iter().enumerate() {
        let index = position as u64;
        let fail = |reason| Err(ChainFault::new(index, reason));

        if position == 0 && !is_valid_genesis(block) {
            return fail(FailureReason::InvalidGenesis);
        }

        if block.index != index {
            return fail(FailureReason::IndexMismatch);
        }

        let recomputed = match compute_block_hash(&block.body()) {
            Ok(hash) => hash,
            Err(_) => return fail(FailureReason::BlockHashMismatch),
        };
        if recomputed != block.block_hash {
            return fail(FailureReason::BlockHashMismatch);
        }

        if let Some(expected_prev) = prev_hash {
            if block.prev_hash != expected_prev {
                return fail(FailureReason::PrevHashMismatch);
            }
        }

        let (signer, signature) = match (
            non_empty(&block.signing_key_id),
            non_empty(&block.signature),
        ) {
            (Some(signer), Some(signature)) => (signer, signature),
            _ => return fail(FailureReason::SignatureMissing),
        };

        if signer != expected_key_id {
            return fail(FailureReason::UnknownKey);
        }

        if !verify_block_hash(public_key, &recomputed, signature) {
            return fail(FailureReason::SignatureInvalid);
        }

        prev_hash = Some(block.block_hash.as_str());
    }

    Ok(())
}
