//! Loading, validating and generating Ed25519 key files.

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Number of hex characters kept from the SPKI digest to form a key id.
pub const KEY_ID_HEX_LEN: usize = 16;

/// Errors raised by key handling and signing.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file {} is not a usable Ed25519 key: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error(
        "private key {} is accessible by group or others (mode {mode:o}); restrict it to the owner",
        .path.display()
    )]
    InsecurePermissions { path: PathBuf, mode: u32 },

    #[error("block hash must be 64 hex characters (32 bytes), got {0:?}")]
    InvalidHash(String),

    #[error("refusing to overwrite existing key file {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to encode key: {0}")]
    Encoding(String),

    #[error("I/O error on key file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn read_pem(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|e| KeyError::Format {
        path: path.to_path_buf(),
        reason: match e.kind() {
            io::ErrorKind::NotFound => "file not found".to_string(),
            _ => e.to_string(),
        },
    })
}

/// Load an Ed25519 public key from a SubjectPublicKeyInfo PEM file.
pub fn load_public_key<P: AsRef<Path>>(path: P) -> Result<VerifyingKey, KeyError> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    VerifyingKey::from_public_key_pem(pem.trim()).map_err(|e| KeyError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load an Ed25519 private key from an unencrypted PKCS#8 PEM file.
///
/// This does not check file permissions; use [`load_signing_key`] for any key
/// that is about to sign.
pub fn load_private_key<P: AsRef<Path>>(path: P) -> Result<SigningKey, KeyError> {
    let path = path.as_ref();
    let pem = read_pem(path)?;
    SigningKey::from_pkcs8_pem(pem.trim()).map_err(|e| KeyError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Check permissions, then load the private key.
pub fn load_signing_key<P: AsRef<Path>>(path: P) -> Result<SigningKey, KeyError> {
    let path = path.as_ref();
    validate_private_key_permissions(path)?;
    load_private_key(path)
}

/// Reject private key files readable, writable or executable by group or others.
#[cfg(unix)]
pub fn validate_private_key_permissions<P: AsRef<Path>>(path: P) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|e| KeyError::Format {
        path: path.to_path_buf(),
        reason: match e.kind() {
            io::ErrorKind::NotFound => "file not found".to_string(),
            _ => e.to_string(),
        },
    })?;
    let mode = metadata.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(KeyError::InsecurePermissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

/// Platforms without POSIX mode bits rely on their own ACLs.
#[cfg(not(unix))]
pub fn validate_private_key_permissions<P: AsRef<Path>>(_path: P) -> Result<(), KeyError> {
    Ok(())
}

/// Derive the stable identifier of a public key.
///
/// SHA-256 over the DER SubjectPublicKeyInfo, truncated to 16 hex characters.
pub fn key_id(public_key: &VerifyingKey) -> Result<String, KeyError> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    let digest = hex::encode(Sha256::digest(der.as_bytes()));
    Ok(digest[..KEY_ID_HEX_LEN].to_string())
}

/// Render a public key as SubjectPublicKeyInfo PEM.
pub fn public_key_pem(public_key: &VerifyingKey) -> Result<String, KeyError> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// Generate a fresh keypair and write it as PEM files.
///
/// The private key is written with owner-only permissions on Unix. Existing
/// files are left alone unless `overwrite` is set.
pub fn generate_keypair<P: AsRef<Path>, Q: AsRef<Path>>(
    private_path: P,
    public_path: Q,
    overwrite: bool,
) -> Result<VerifyingKey, KeyError> {
    let private_path = private_path.as_ref();
    let public_path = public_path.as_ref();

    if !overwrite {
        for path in [private_path, public_path] {
            if path.exists() {
                return Err(KeyError::AlreadyExists(path.to_path_buf()));
            }
        }
    }

    let secret: [u8; 32] = rand::random();
    let signing_key = SigningKey::from_bytes(&secret);
    let verifying_key = signing_key.verifying_key();

    let private_pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    let public_pem = public_key_pem(&verifying_key)?;

    write_private(private_path, private_pem.as_bytes())?;
    write_file(public_path, public_pem.as_bytes())?;

    info!(
        private = %private_path.display(),
        public = %public_path.display(),
        key_id = %key_id(&verifying_key)?,
        "generated Ed25519 keypair"
    );
    Ok(verifying_key)
}

fn ensure_parent(path: &Path) -> Result<(), KeyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| KeyError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), KeyError> {
    ensure_parent(path)?;
    fs::write(path, bytes).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), KeyError> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    ensure_parent(path)?;
    let io_err = |source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(io_err)?;
    // `mode` only applies on creation; tighten a pre-existing file too.
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.sync_all().map_err(io_err)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), KeyError> {
    write_file(path, bytes)
}
