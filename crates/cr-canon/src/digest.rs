//! SHA-256 helpers, including a bounded-memory streaming digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when hashing streams (4 MiB).
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Digest and length of a hashed byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub sha256: String,
    pub size_bytes: u64,
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash a reader to exhaustion in fixed-size chunks.
///
/// Peak memory is one chunk no matter how large the input is.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<FileDigest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size_bytes = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
        size_bytes += n as u64;
    }

    Ok(FileDigest {
        sha256: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

/// Hash a file on disk.
pub fn sha256_file<P: AsRef<Path>>(path: P) -> io::Result<FileDigest> {
    let file = File::open(path.as_ref())?;
    sha256_reader(file)
}
