//! Vitals state engine
//!
//! Owns the current vitals snapshot, the bounded history, the thresholds,
//! and the connection flag. Every update replaces the snapshot wholesale so
//! observers never see a half-classified state. History and thresholds are
//! persisted through the injected store on every mutation.

use crate::error::StoreError;
use crate::store::VitalsStore;
use crate::vitals::{
    check_spo2_status, check_vital_status, BloodPressure, HistoryEntry, Thresholds,
    ThresholdsUpdate, Trend, VitalReading, VitalsSample, VitalsSnapshot, BP_SYSTOLIC_MIN,
    HISTORY_CAP,
};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// A manual reading with any subset of signals provided
///
/// Omitted fields fall back to the current snapshot value so the resulting
/// history entry is always fully populated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualReading {
    pub heart_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub spo2: Option<f64>,
    pub temperature: Option<f64>,
}

impl ManualReading {
    /// True when no signal was provided at all
    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_none()
            && self.systolic_bp.is_none()
            && self.diastolic_bp.is_none()
            && self.spo2.is_none()
            && self.temperature.is_none()
    }
}

/// The vitals state engine
pub struct VitalsEngine {
    store: Box<dyn VitalsStore>,
    vitals: VitalsSnapshot,
    history: VecDeque<HistoryEntry>,
    thresholds: Thresholds,
    connected: bool,
}

impl VitalsEngine {
    /// Create an engine, restoring history and thresholds from the store
    ///
    /// Missing records yield empty history and default thresholds. Corrupt
    /// records are logged and replaced with defaults; startup never fails
    /// on bad persisted data.
    pub fn new(store: Box<dyn VitalsStore>) -> Self {
        let history = match store.load_history() {
            Ok(Some(entries)) => {
                info!("Restored {} history entries", entries.len());
                entries.into_iter().collect()
            }
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("Failed to load history, starting empty: {}", e);
                VecDeque::new()
            }
        };

        let thresholds = match store.load_thresholds() {
            Ok(Some(t)) => t,
            Ok(None) => Thresholds::default(),
            Err(e) => {
                warn!("Failed to load thresholds, using defaults: {}", e);
                Thresholds::default()
            }
        };

        Self {
            store,
            vitals: VitalsSnapshot::default(),
            history,
            thresholds,
            connected: false,
        }
    }

    /// Current snapshot of all four readings
    pub fn snapshot(&self) -> &VitalsSnapshot {
        &self.vitals
    }

    /// History in chronological order, at most `HISTORY_CAP` entries
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Mark the device connected; existing history is untouched
    pub fn connect(&mut self) {
        self.connected = true;
        info!("Device connected");
    }

    /// Mark the device disconnected and discard all history
    ///
    /// Clears both the in-memory sequence and the persisted record.
    /// Idempotent.
    pub fn disconnect(&mut self) -> Result<(), StoreError> {
        self.connected = false;
        self.history.clear();
        self.store.clear_history()?;
        info!("Device disconnected, history cleared");
        Ok(())
    }

    /// Merge a partial threshold update and persist the merged set
    ///
    /// The new values take effect for the next classification immediately.
    pub fn update_thresholds(&mut self, update: &ThresholdsUpdate) -> Result<(), StoreError> {
        self.thresholds = self.thresholds.merged(update);
        self.store.save_thresholds(&self.thresholds)
    }

    /// Record a manual reading, filling omitted fields from the snapshot
    ///
    /// Reclassifies the snapshot from the completed entry (trends keep
    /// their previous direction: a manual entry has no meaningful cadence),
    /// appends to history under the cap, and persists. Does not require an
    /// active connection.
    pub fn add_manual_reading(&mut self, reading: &ManualReading) -> Result<(), StoreError> {
        let sample = VitalsSample {
            heart_rate: reading.heart_rate.unwrap_or(self.vitals.heart_rate.value),
            systolic_bp: reading
                .systolic_bp
                .unwrap_or(self.vitals.blood_pressure.systolic),
            diastolic_bp: reading
                .diastolic_bp
                .unwrap_or(self.vitals.blood_pressure.diastolic),
            spo2: reading.spo2.unwrap_or(self.vitals.spo2.value),
            temperature: reading.temperature.unwrap_or(self.vitals.temperature.value),
        };

        self.vitals = self.classify(&sample, TrendMode::Keep);
        self.append_entry(&sample)
    }

    /// Record a fully-populated sample from the simulator tick
    ///
    /// Classifies against the current thresholds, recomputes trends
    /// relative to the immediately preceding values, appends, and persists.
    pub fn record_sample(&mut self, sample: &VitalsSample) -> Result<(), StoreError> {
        self.vitals = self.classify(sample, TrendMode::Recompute);
        self.append_entry(sample)
    }

    /// Write the full history as pretty-printed JSON into `dir`
    ///
    /// Returns the path of the created `health-data-<timestamp>.json` file.
    pub fn export_history(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        let entries: Vec<&HistoryEntry> = self.history.iter().collect();
        let body = serde_json::to_string_pretty(&entries)?;

        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let path = dir.join(format!("health-data-{}.json", stamp));
        fs::write(&path, body)?;
        info!("Exported {} entries to {}", entries.len(), path.display());
        Ok(path)
    }

    /// Build a replacement snapshot from a sample
    fn classify(&self, sample: &VitalsSample, trends: TrendMode) -> VitalsSnapshot {
        let prev = &self.vitals;

        let trend_of = |current: f64, previous: f64, kept: Trend| match trends {
            TrendMode::Keep => kept,
            TrendMode::Recompute => Trend::from_change(current, previous),
        };

        VitalsSnapshot {
            heart_rate: VitalReading {
                value: sample.heart_rate,
                unit: prev.heart_rate.unit.clone(),
                status: check_vital_status(
                    sample.heart_rate,
                    self.thresholds.heart_rate_min,
                    self.thresholds.heart_rate_max,
                ),
                trend: trend_of(
                    sample.heart_rate,
                    prev.heart_rate.value,
                    prev.heart_rate.trend,
                ),
            },
            blood_pressure: BloodPressure {
                systolic: sample.systolic_bp,
                diastolic: sample.diastolic_bp,
                status: check_vital_status(
                    sample.systolic_bp,
                    BP_SYSTOLIC_MIN,
                    self.thresholds.bp_systolic_max,
                ),
            },
            spo2: VitalReading {
                value: sample.spo2,
                unit: prev.spo2.unit.clone(),
                status: check_spo2_status(sample.spo2, self.thresholds.spo2_min),
                trend: trend_of(sample.spo2, prev.spo2.value, prev.spo2.trend),
            },
            temperature: VitalReading {
                value: sample.temperature,
                unit: prev.temperature.unit.clone(),
                status: check_vital_status(
                    sample.temperature,
                    self.thresholds.temp_min,
                    self.thresholds.temp_max,
                ),
                trend: trend_of(
                    sample.temperature,
                    prev.temperature.value,
                    prev.temperature.trend,
                ),
            },
        }
    }

    /// Append a history entry, evicting the oldest past the cap, and persist
    fn append_entry(&mut self, sample: &VitalsSample) -> Result<(), StoreError> {
        let entry = HistoryEntry::at(
            Utc::now(),
            sample.heart_rate,
            sample.systolic_bp,
            sample.diastolic_bp,
            sample.spo2,
            sample.temperature,
        );

        self.history.push_back(entry);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }

        let owned: Vec<HistoryEntry> = self.history.iter().cloned().collect();
        self.store.save_history(&owned)
    }
}

/// How the snapshot's trends are derived during classification
#[derive(Debug, Clone, Copy)]
enum TrendMode {
    /// Keep the previous trend (manual entries)
    Keep,
    /// Compare against the immediately preceding value (simulator ticks)
    Recompute,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::vitals::VitalStatus;

    fn engine() -> VitalsEngine {
        VitalsEngine::new(Box::new(MemoryStore::new()))
    }

    fn sample(heart_rate: f64) -> VitalsSample {
        VitalsSample {
            heart_rate,
            systolic_bp: 120.0,
            diastolic_bp: 80.0,
            spo2: 98.0,
            temperature: 36.6,
        }
    }

    #[test]
    fn test_manual_reading_critical_heart_rate() {
        let mut engine = engine();

        engine
            .add_manual_reading(&ManualReading {
                heart_rate: Some(150.0),
                ..Default::default()
            })
            .unwrap();

        // 150 > 100 * 1.15
        assert_eq!(engine.snapshot().heart_rate.status, VitalStatus::Critical);
        assert_eq!(engine.snapshot().heart_rate.value, 150.0);
    }

    #[test]
    fn test_manual_reading_fills_omitted_fields_from_snapshot() {
        let mut engine = engine();

        engine
            .add_manual_reading(&ManualReading {
                heart_rate: Some(150.0),
                ..Default::default()
            })
            .unwrap();

        let entry = engine.history().last().unwrap();
        // Untouched fields come from the prior snapshot, never left empty
        assert_eq!(entry.heart_rate, 150.0);
        assert_eq!(entry.systolic_bp, 120.0);
        assert_eq!(entry.diastolic_bp, 80.0);
        assert_eq!(entry.spo2, 98.0);
        assert_eq!(entry.temperature, 36.6);
    }

    #[test]
    fn test_manual_reading_keeps_previous_trend() {
        let mut engine = engine();

        engine.record_sample(&sample(90.0)).unwrap();
        assert_eq!(engine.snapshot().heart_rate.trend, Trend::Up);

        engine
            .add_manual_reading(&ManualReading {
                heart_rate: Some(60.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.snapshot().heart_rate.trend, Trend::Up);
    }

    #[test]
    fn test_manual_reading_works_while_disconnected() {
        let mut engine = engine();
        assert!(!engine.is_connected());

        engine
            .add_manual_reading(&ManualReading {
                spo2: Some(97.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.history_len(), 1);
    }

    #[test]
    fn test_history_cap_evicts_oldest() {
        let mut engine = engine();

        for i in 0..(HISTORY_CAP + 1) {
            engine.record_sample(&sample(60.0 + i as f64 * 0.1)).unwrap();
        }

        assert_eq!(engine.history_len(), HISTORY_CAP);
        // The first appended entry (heart rate 60.0) has been evicted
        let oldest = engine.history().next().unwrap();
        assert_eq!(oldest.heart_rate, 60.1);
        let newest = engine.history().last().unwrap();
        assert_eq!(newest.heart_rate, 60.0 + HISTORY_CAP as f64 * 0.1);
    }

    #[test]
    fn test_disconnect_clears_history_and_persisted_record() {
        let store = MemoryStore::new();
        let mut engine = VitalsEngine::new(Box::new(store));

        engine.connect();
        engine.record_sample(&sample(72.0)).unwrap();
        assert_eq!(engine.history_len(), 1);

        engine.disconnect().unwrap();
        assert!(!engine.is_connected());
        assert_eq!(engine.history_len(), 0);

        // Disconnect twice is fine
        engine.disconnect().unwrap();
    }

    #[test]
    fn test_connect_keeps_existing_history() {
        let mut engine = engine();
        engine.record_sample(&sample(72.0)).unwrap();

        engine.connect();
        assert_eq!(engine.history_len(), 1);
    }

    #[test]
    fn test_updated_thresholds_take_effect_immediately() {
        let mut engine = engine();

        engine
            .update_thresholds(&ThresholdsUpdate {
                spo2_min: Some(90.0),
                ..Default::default()
            })
            .unwrap();

        engine
            .add_manual_reading(&ManualReading {
                spo2: Some(92.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.snapshot().spo2.status, VitalStatus::Normal);

        engine
            .add_manual_reading(&ManualReading {
                spo2: Some(89.0),
                ..Default::default()
            })
            .unwrap();
        // SpO2 is never critical, only warning
        assert_eq!(engine.snapshot().spo2.status, VitalStatus::Warning);
    }

    #[test]
    fn test_systolic_classified_against_fixed_floor() {
        let mut engine = engine();

        engine
            .add_manual_reading(&ManualReading {
                systolic_bp: Some(85.0),
                ..Default::default()
            })
            .unwrap();
        // 85 < 90 but not below 90 * 0.85 = 76.5
        assert_eq!(
            engine.snapshot().blood_pressure.status,
            VitalStatus::Warning
        );

        engine
            .add_manual_reading(&ManualReading {
                systolic_bp: Some(70.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            engine.snapshot().blood_pressure.status,
            VitalStatus::Critical
        );
    }

    #[test]
    fn test_record_sample_trends() {
        let mut engine = engine();

        engine.record_sample(&sample(80.0)).unwrap();
        assert_eq!(engine.snapshot().heart_rate.trend, Trend::Up);

        engine.record_sample(&sample(70.0)).unwrap();
        assert_eq!(engine.snapshot().heart_rate.trend, Trend::Down);

        engine.record_sample(&sample(70.0)).unwrap();
        assert_eq!(engine.snapshot().heart_rate.trend, Trend::Stable);
        // SpO2 was unchanged throughout
        assert_eq!(engine.snapshot().spo2.trend, Trend::Stable);
    }

    #[test]
    fn test_state_survives_restart_through_store() {
        let dir = tempfile::TempDir::new().unwrap();

        {
            let store = crate::store::FileStore::new(dir.path()).unwrap();
            let mut engine = VitalsEngine::new(Box::new(store));
            engine.record_sample(&sample(72.0)).unwrap();
            engine
                .update_thresholds(&ThresholdsUpdate {
                    heart_rate_max: Some(110.0),
                    ..Default::default()
                })
                .unwrap();
        }

        let store = crate::store::FileStore::new(dir.path()).unwrap();
        let engine = VitalsEngine::new(Box::new(store));
        assert_eq!(engine.history_len(), 1);
        assert_eq!(engine.thresholds().heart_rate_max, 110.0);
    }

    #[test]
    fn test_corrupt_history_falls_back_to_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("vitals_history.json"), "][").unwrap();

        let store = crate::store::FileStore::new(dir.path()).unwrap();
        let engine = VitalsEngine::new(Box::new(store));
        assert_eq!(engine.history_len(), 0);
        assert_eq!(engine.thresholds(), &Thresholds::default());
    }

    #[test]
    fn test_export_writes_full_history() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut engine = engine();

        engine.record_sample(&sample(72.0)).unwrap();
        engine.record_sample(&sample(75.0)).unwrap();

        let path = engine.export_history(dir.path()).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("health-data-"));

        let body = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<HistoryEntry> = serde_json::from_str(&body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].heart_rate, 72.0);
    }
}
