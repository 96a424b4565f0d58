// src/store.rs

//! Single-slot correlation store
//!
//! The pre and post hooks run as separate processes, so the only thing they
//! share is one JSON file. At most one record exists at a time: pre refuses
//! to overwrite a pending record and post deletes the record as soon as it
//! has read it.
//!
//! There is no locking. APT never runs the pre and post hooks of one
//! transaction concurrently, and that ordering is what keeps the slot sane.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Classified nature of the monitored operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Package archives were staged for installation
    Install,
    /// Packages disappeared between pre and post
    Remove,
    /// Nothing was staged; resolved by diffing installed packages in post
    Unknown,
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Install => "Install",
            ActionKind::Remove => "Remove",
            ActionKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the post hook needs to know about the pre snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    /// Number snapper printed for the pre snapshot
    #[serde(alias = "pre_num")]
    pub pre_snapshot_id: String,

    #[serde(alias = "apt_action")]
    pub action_kind: ActionKind,

    /// Install: staged package names. Unknown: every installed package.
    #[serde(alias = "pkg_names")]
    pub package_set: Vec<String>,

    /// apt command line recovered from the process table, if any
    #[serde(default)]
    pub invocation: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CorrelationRecord {
    /// Create a new record stamped with the current time
    pub fn new(pre_snapshot_id: String, action_kind: ActionKind, package_set: Vec<String>) -> Self {
        Self {
            pre_snapshot_id,
            action_kind,
            package_set,
            invocation: None,
            created_at: Utc::now(),
        }
    }
}

/// File-backed single-slot store for one [`CorrelationRecord`]
#[derive(Debug, Clone)]
pub struct CorrelationStore {
    path: PathBuf,
}

impl CorrelationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record is pending
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the pending record without removing it
    pub fn peek(&self) -> Result<CorrelationRecord> {
        match fs::read(&self.path) {
            Ok(bytes) => self.parse(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::RecordMissing(self.path.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `record` into the slot
    ///
    /// The record goes to a sibling temp file first and is renamed into
    /// place, so a crash never leaves a half-written record behind.
    pub fn save(&self, record: &CorrelationRecord) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.write_all(b"\n")?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        debug!("Saved correlation record to {}", self.path.display());
        Ok(())
    }

    /// Read the pending record and clear the slot
    ///
    /// Returns `Ok(None)` when nothing is pending. The file is removed before
    /// its content is parsed, so even a corrupt record is consumed exactly
    /// once and cannot poison the next transaction.
    pub fn take(&self) -> Result<Option<CorrelationRecord>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.consume(&bytes, fs::remove_file(&self.path))
    }

    /// Finish a `take` once the record file has been read and unlinked
    ///
    /// A record that could not be removed is an error: left in place it
    /// would block every later pre hook and pair every later post hook with
    /// a stale pre snapshot.
    fn consume(&self, bytes: &[u8], removed: io::Result<()>) -> Result<Option<CorrelationRecord>> {
        match removed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Correlation record {} vanished after it was read", self.path.display());
            }
            Err(e) => {
                error!("Failed to remove correlation record {}: {}", self.path.display(), e);
                return Err(e.into());
            }
        }

        self.parse(bytes).map(Some)
    }

    fn parse(&self, bytes: &[u8]) -> Result<CorrelationRecord> {
        serde_json::from_slice(bytes).map_err(|source| Error::RecordCorrupt {
            path: self.path.clone(),
            source,
        })
    }
}
