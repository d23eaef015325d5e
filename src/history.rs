//! Bounded triage history.
//!
//! Completed sessions land in a single JSON file, most recent first,
//! capped at ten entries. Reading is fail-soft: a missing or corrupt
//! file is an empty history, never an error the triage flow sees.
//! Records get their id and timestamp here, at persist time.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::config;
use crate::models::{HistoryRecord, PatientProfile, TriageOutcome};

/// Most entries kept on disk; older ones age out.
pub const HISTORY_CAP: usize = 10;

/// File-backed history log.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Open a store at an explicit path. No I/O happens until the
    /// first read or append.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Open the store at the standard application data path.
    pub fn open_default() -> Self {
        Self::new(config::history_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, most recent first. Missing or unreadable files read
    /// as empty.
    pub fn list(&self) -> Vec<HistoryRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read history file, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "History file corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Stamp a completed session and persist it at the head of the log.
    pub fn append(
        &self,
        profile: PatientProfile,
        symptoms: String,
        outcome: TriageOutcome,
    ) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            profile,
            symptoms,
            outcome,
        };

        let mut records = self.list();
        records.insert(0, record.clone());
        records.truncate(HISTORY_CAP);
        self.write(&records)?;

        tracing::debug!(record_id = %record.id, total = records.len(), "Persisted triage record");
        Ok(record)
    }

    /// Remove the whole log. Idempotent.
    pub fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, records: &[HistoryRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
