//! Locked, atomic persistence of the ledger and its anchor.
//!
//! Writers serialize on a lock marker created with `create_new`; readers take
//! no lock and rely on every write being a rename of a fully written sibling
//! temp file, so a crash mid-write leaves the previous file intact.

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::types::{Anchor, Ledger};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Held for the duration of a write; removes the lock marker when dropped.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Take the lock at `path`, polling every `poll` until `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration, poll: Duration) -> Result<Self, LedgerError> {
        ensure_parent(path)?;
        let started = Instant::now();
        let mut contended = false;

        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // Holder pid is informational only.
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(lock = %path.display(), "ledger lock acquired");
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if !contended {
                        debug!(lock = %path.display(), "ledger lock busy, waiting");
                        contended = true;
                    }
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!(
                            lock = %path.display(),
                            waited_ms = waited.as_millis() as u64,
                            "gave up waiting for ledger lock"
                        );
                        return Err(LedgerError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(poll.min(timeout - waited));
                }
                Err(e) => return Err(LedgerError::storage(path, e)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), err = %e, "failed to release ledger lock");
        } else {
            debug!(lock = %self.path.display(), "ledger lock released");
        }
    }
}

/// Reads and writes the ledger and anchor files named by a [`LedgerConfig`].
#[derive(Debug, Clone)]
pub struct LedgerStore {
    config: LedgerConfig,
}

impl LedgerStore {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn ledger_exists(&self) -> bool {
        self.config.ledger_path.exists()
    }

    pub fn anchor_exists(&self) -> bool {
        self.config.anchor_path.exists()
    }

    /// Read the ledger, or `None` if it has not been created yet.
    pub fn read_ledger(&self) -> Result<Option<Ledger>, LedgerError> {
        read_json(&self.config.ledger_path)
    }

    /// Read the anchor, or `None` if it does not exist.
    pub fn read_anchor(&self) -> Result<Option<Anchor>, LedgerError> {
        read_json(&self.config.anchor_path)
    }

    /// Take the exclusive writer lock.
    pub fn lock(&self) -> Result<LockGuard, LedgerError> {
        LockGuard::acquire(
            &self.config.lock_path,
            self.config.lock_timeout,
            self.config.lock_poll_interval,
        )
    }

    /// Lock, write the ledger, write its anchor, unlock.
    pub fn save(&self, ledger: &Ledger) -> Result<Anchor, LedgerError> {
        let guard = self.lock()?;
        self.save_locked(&guard, ledger)
    }

    /// Write the ledger and its anchor while the caller holds the lock.
    pub fn save_locked(&self, guard: &LockGuard, ledger: &Ledger) -> Result<Anchor, LedgerError> {
        debug_assert_eq!(guard.path(), self.config.lock_path.as_path());
        write_json_atomic(&self.config.ledger_path, ledger)?;
        self.write_anchor_locked(guard, ledger)
    }

    /// Rebuild the anchor from the ledger's last block.
    pub fn write_anchor_locked(
        &self,
        guard: &LockGuard,
        ledger: &Ledger,
    ) -> Result<Anchor, LedgerError> {
        debug_assert_eq!(guard.path(), self.config.lock_path.as_path());
        let latest = ledger.latest().ok_or_else(|| {
            LedgerError::storage(
                &self.config.ledger_path,
                io::Error::new(io::ErrorKind::InvalidData, "ledger has no blocks"),
            )
        })?;
        let anchor = Anchor::for_block(self.config.display_path(&self.config.ledger_path), latest);
        write_json_atomic(&self.config.anchor_path, &anchor)?;
        debug!(
            latest_index = anchor.latest_index,
            anchor = %self.config.anchor_path.display(),
            "anchor written"
        );
        Ok(anchor)
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn ensure_parent(path: &Path) -> Result<(), LedgerError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| LedgerError::storage(parent, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LedgerError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LedgerError::storage(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| LedgerError::Malformed {
            path: path.to_path_buf(),
            source,
        })
}

/// Replace `path` with `bytes` via a synced temp file in the same directory.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    ensure_parent(path)?;
    let parent = parent_dir(path);
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| LedgerError::storage(parent, e))?;
    temp.write_all(bytes)
        .map_err(|e| LedgerError::storage(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| LedgerError::storage(temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| LedgerError::storage(path, e.error))?;
    Ok(())
}

/// Pretty-print `value` as JSON with a trailing newline and write it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), LedgerError> {
    let mut json = serde_json::to_string_pretty(value).map_err(LedgerError::Serialize)?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

/// Copy `src` over `dst` atomically.
pub fn atomic_copy(src: &Path, dst: &Path) -> Result<(), LedgerError> {
    ensure_parent(dst)?;
    let parent = parent_dir(dst);
    let mut source = File::open(src).map_err(|e| LedgerError::storage(src, e))?;
    let mut temp = NamedTempFile::new_in(parent).map_err(|e| LedgerError::storage(parent, e))?;
    io::copy(&mut source, &mut temp).map_err(|e| LedgerError::storage(dst, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| LedgerError::storage(temp.path(), e))?;
    temp.persist(dst)
        .map_err(|e| LedgerError::storage(dst, e.error))?;
    Ok(())
}
