//! Ed25519 signatures over 32-byte block digests.

use crate::keys::{key_id, KeyError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

fn decode_digest(block_hash_hex: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(block_hash_hex).ok()?;
    bytes.try_into().ok()
}

/// Sign a block hash with an Ed25519 private key.
///
/// # Arguments
/// * `signing_key` - Private key of the ledger operator
/// * `block_hash_hex` - 64 hex characters; the decoded 32 bytes are what gets signed
///
/// # Returns
/// The base64 signature and the key id of the signer.
pub fn sign_block_hash(
    signing_key: &SigningKey,
    block_hash_hex: &str,
) -> Result<(String, String), KeyError> {
    let digest = decode_digest(block_hash_hex)
        .ok_or_else(|| KeyError::InvalidHash(block_hash_hex.to_string()))?;

    let signature = signing_key.sign(&digest);
    let signer = key_id(&signing_key.verifying_key())?;
    Ok((BASE64.encode(signature.to_bytes()), signer))
}

/// Verify a base64 signature over a block hash.
///
/// Never fails: malformed hex, malformed base64, a wrong signature length or a
/// cryptographic mismatch all yield `false`.
pub fn verify_block_hash(
    public_key: &VerifyingKey,
    block_hash_hex: &str,
    signature_b64: &str,
) -> bool {
    let digest = match decode_digest(block_hash_hex) {
        Some(digest) => digest,
        None => return false,
    };

    let sig_bytes = match BASE64.decode(signature_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    if sig_bytes.len() != 64 {
        return false;
    }

    let mut sig_array = [0u8; 64];
    sig_array.copy_from_slice(&sig_bytes);
    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);

    public_key.verify(&digest, &signature).is_ok()
}
