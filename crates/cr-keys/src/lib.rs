//! Ed25519 key management and block-hash signatures.
//!
//! Keys live on disk as PEM: PKCS#8 for the private key, SubjectPublicKeyInfo for
//! the public key. Every signature covers the raw 32-byte SHA-256 block digest,
//! never its hex text, and is carried as standard base64.
//!
//! # Example
//!
//! ```
//! use cr_keys::{generate_keypair, load_public_key, load_signing_key, sign_block_hash, verify_block_hash};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let private_path = dir.path().join("private_key.pem");
//! let public_path = dir.path().join("public_key.pem");
//! generate_keypair(&private_path, &public_path, false).unwrap();
//!
//! let signing_key = load_signing_key(&private_path).unwrap();
//! let public_key = load_public_key(&public_path).unwrap();
//!
//! let digest = "ab".repeat(32);
//! let (signature, _key_id) = sign_block_hash(&signing_key, &digest).unwrap();
//! assert!(verify_block_hash(&public_key, &digest, &signature));
//! ```

mod keys;
mod signature;

pub use ed25519_dalek::{SigningKey, VerifyingKey};
pub use keys::{
    generate_keypair, key_id, load_private_key, load_public_key, load_signing_key,
    public_key_pem, validate_private_key_permissions, KeyError, KEY_ID_HEX_LEN,
};
pub use signature::{sign_block_hash, verify_block_hash};

/// Signature algorithm label recorded in ledger headers.
pub const SIGNATURE_ALGORITHM: &str = "ed25519";
