//! Session record stores
//!
//! Records are append-only and keyed by patient identity. The core never
//! reads them back; [`JsonLinesStore::load`] exists for tooling and tests.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{FlexoError, Result, ResultExt};

use super::types::SessionRecord;

/// Destination for finished session records
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send {
    /// Append one record for `patient_id`
    fn append(&mut self, patient_id: &str, record: &SessionRecord) -> Result<()>;
}

/// Append-only JSON-lines files, one per patient
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    root: PathBuf,
}

impl JsonLinesStore {
    /// Store records under `root`, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create session directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// Directory holding the patient files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `patient_id`'s records
    pub fn patient_file(&self, patient_id: &str) -> PathBuf {
        let safe: String = patient_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.jsonl", safe))
    }

    /// Read back every record stored for `patient_id`
    pub fn load(&self, patient_id: &str) -> Result<Vec<SessionRecord>> {
        let path = self.patient_file(patient_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path).context("Failed to open session file")?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl SessionStore for JsonLinesStore {
    fn append(&mut self, patient_id: &str, record: &SessionRecord) -> Result<()> {
        let path = self.patient_file(patient_id);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(
            "Saved session '{}' ({} reps) to {}",
            record.exercise_name,
            record.reps,
            path.display()
        );
        Ok(())
    }
}

/// In-memory store shared between clones
///
/// `set_failing(true)` makes every append fail, to exercise the retry path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<(String, SessionRecord)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make appends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All records with their patient ids, oldest first
    pub fn records(&self) -> Vec<(String, SessionRecord)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    /// Whether no record has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn append(&mut self, patient_id: &str, record: &SessionRecord) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlexoError::Persistence("store unavailable".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| FlexoError::Persistence("store lock poisoned".to_string()))?
            .push((patient_id.to_string(), record.clone()));
        Ok(())
    }
}
