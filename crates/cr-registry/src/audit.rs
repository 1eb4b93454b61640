//! Fire-and-forget audit trail of registry operations.

use cr_ledger::utc_now_seconds;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Failure,
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp_utc: String,
    pub action: String,
    pub status: AuditStatus,
    pub details: Value,
}

/// Receives one event per registry operation outcome. Implementations must
/// not fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, action: &str, status: AuditStatus, details: Value);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _action: &str, _status: AuditStatus, _details: Value) {}
}

/// Appends events as JSON lines to a file.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let _held = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, action: &str, status: AuditStatus, details: Value) {
        let event = AuditEvent {
            timestamp_utc: utc_now_seconds(),
            action: action.to_string(),
            status,
            details,
        };
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!(action, err = %e, "failed to encode audit event");
                return;
            }
        };
        line.push('\n');
        if let Err(e) = self.append(&line) {
            warn!(action, path = %self.path.display(), err = %e, "failed to write audit event");
        }
    }
}
