//! Persistence for history and thresholds
//!
//! Two independent records are kept: the bounded vitals history and the
//! alert thresholds. Each is read once at engine startup and rewritten in
//! full on every relevant mutation. The store is an injected dependency so
//! the engine never touches a process-wide singleton.

use crate::error::StoreError;
use crate::vitals::{HistoryEntry, Thresholds};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage seam for the vitals engine
///
/// `load_*` returns `Ok(None)` when no record exists and an error when a
/// record exists but cannot be decoded; the engine treats decode errors as
/// corruption and falls back to defaults.
pub trait VitalsStore: Send {
    fn load_history(&self) -> Result<Option<Vec<HistoryEntry>>, StoreError>;
    fn save_history(&self, history: &[HistoryEntry]) -> Result<(), StoreError>;
    fn clear_history(&self) -> Result<(), StoreError>;

    fn load_thresholds(&self) -> Result<Option<Thresholds>, StoreError>;
    fn save_thresholds(&self, thresholds: &Thresholds) -> Result<(), StoreError>;
}

/// File-backed store keeping one JSON document per record
pub struct FileStore {
    history_path: PathBuf,
    thresholds_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed
    pub fn new(data_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            history_path: data_dir.join("vitals_history.json"),
            thresholds_path: data_dir.join("vitals_thresholds.json"),
        })
    }

    fn load_record<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    fn save_record<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        fs::write(path, raw)?;
        debug!("Persisted record to {}", path.display());
        Ok(())
    }
}

impl VitalsStore for FileStore {
    fn load_history(&self) -> Result<Option<Vec<HistoryEntry>>, StoreError> {
        Self::load_record(&self.history_path)
    }

    fn save_history(&self, history: &[HistoryEntry]) -> Result<(), StoreError> {
        Self::save_record(&self.history_path, &history)
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        if self.history_path.exists() {
            fs::remove_file(&self.history_path)?;
        }
        Ok(())
    }

    fn load_thresholds(&self) -> Result<Option<Thresholds>, StoreError> {
        Self::load_record(&self.thresholds_path)
    }

    fn save_thresholds(&self, thresholds: &Thresholds) -> Result<(), StoreError> {
        Self::save_record(&self.thresholds_path, thresholds)
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    history: Mutex<Option<Vec<HistoryEntry>>>,
    thresholds: Mutex<Option<Thresholds>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VitalsStore for MemoryStore {
    fn load_history(&self) -> Result<Option<Vec<HistoryEntry>>, StoreError> {
        Ok(self.history.lock().unwrap().clone())
    }

    fn save_history(&self, history: &[HistoryEntry]) -> Result<(), StoreError> {
        *self.history.lock().unwrap() = Some(history.to_vec());
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        *self.history.lock().unwrap() = None;
        Ok(())
    }

    fn load_thresholds(&self) -> Result<Option<Thresholds>, StoreError> {
        Ok(self.thresholds.lock().unwrap().clone())
    }

    fn save_thresholds(&self, thresholds: &Thresholds) -> Result<(), StoreError> {
        *self.thresholds.lock().unwrap() = Some(thresholds.clone());
        Ok(())
    }
}
