//! Core vital-sign types and threshold classification
//!
//! This module defines the fundamental data structures used throughout the
//! application for representing vital readings, history entries, and alert
//! thresholds, plus the status classification rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Maximum number of history entries retained in memory and on disk
pub const HISTORY_CAP: usize = 100;

/// Severity classification of a vital reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum VitalStatus {
    /// Value within the configured thresholds
    Normal,
    /// Value outside the thresholds but not severely so
    Warning,
    /// Value more than 15% beyond the thresholds
    Critical,
}

/// Direction of change of a vital relative to its previous reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    /// Compute the trend of `current` relative to `previous`
    ///
    /// Strictly greater yields `Up`, strictly less yields `Down`,
    /// equal yields `Stable`.
    pub fn from_change(current: f64, previous: f64) -> Self {
        if current > previous {
            Trend::Up
        } else if current < previous {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

/// A single classified vital reading (heart rate, SpO2, or temperature)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalReading {
    /// Measured or simulated value
    pub value: f64,
    /// Display unit, e.g. "bpm" or "%"
    pub unit: String,
    /// Severity derived from the current thresholds
    pub status: VitalStatus,
    /// Direction of change relative to the previous reading
    pub trend: Trend,
}

/// Blood pressure pair; carries a status but no trend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
    pub status: VitalStatus,
}

/// Aggregate of the four current vital readings
///
/// Exactly one snapshot is owned by the engine and replaced wholesale on
/// every update, so observers always see a consistent state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalsSnapshot {
    pub heart_rate: VitalReading,
    pub blood_pressure: BloodPressure,
    pub spo2: VitalReading,
    pub temperature: VitalReading,
}

impl Default for VitalsSnapshot {
    fn default() -> Self {
        Self {
            heart_rate: VitalReading {
                value: 72.0,
                unit: "bpm".to_string(),
                status: VitalStatus::Normal,
                trend: Trend::Stable,
            },
            blood_pressure: BloodPressure {
                systolic: 120.0,
                diastolic: 80.0,
                status: VitalStatus::Normal,
            },
            spo2: VitalReading {
                value: 98.0,
                unit: "%".to_string(),
                status: VitalStatus::Normal,
                trend: Trend::Stable,
            },
            temperature: VitalReading {
                value: 36.6,
                unit: "°C".to_string(),
                status: VitalStatus::Normal,
                trend: Trend::Stable,
            },
        }
    }
}

/// One immutable history record, appended in chronological order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Human-readable time of day, e.g. "14:03:27"
    pub time: String,
    /// Epoch milliseconds of the reading
    pub timestamp: i64,
    pub heart_rate: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub spo2: f64,
    pub temperature: f64,
}

impl HistoryEntry {
    /// Build an entry stamped with the given instant
    pub fn at(
        now: Timestamp,
        heart_rate: f64,
        systolic_bp: f64,
        diastolic_bp: f64,
        spo2: f64,
        temperature: f64,
    ) -> Self {
        Self {
            time: now.format("%H:%M:%S").to_string(),
            timestamp: now.timestamp_millis(),
            heart_rate,
            systolic_bp,
            diastolic_bp,
            spo2,
            temperature,
        }
    }
}

/// One fully-populated set of raw values, before classification
///
/// Produced by the simulator and by manual entry after fallback fill-in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalsSample {
    pub heart_rate: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
    pub spo2: f64,
    pub temperature: f64,
}

/// Configurable alert boundaries for the four signals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub heart_rate_max: f64,
    pub heart_rate_min: f64,
    pub bp_systolic_max: f64,
    pub spo2_min: f64,
    pub temp_max: f64,
    pub temp_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_rate_max: 100.0,
            heart_rate_min: 60.0,
            bp_systolic_max: 140.0,
            spo2_min: 95.0,
            temp_max: 37.5,
            temp_min: 36.0,
        }
    }
}

/// Partial threshold update; unset fields keep their previous value
///
/// Merging is always over a complete set, so no field can become undefined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsUpdate {
    pub heart_rate_max: Option<f64>,
    pub heart_rate_min: Option<f64>,
    pub bp_systolic_max: Option<f64>,
    pub spo2_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
}

impl Thresholds {
    /// Merge a partial update over the current complete set
    pub fn merged(&self, update: &ThresholdsUpdate) -> Self {
        Self {
            heart_rate_max: update.heart_rate_max.unwrap_or(self.heart_rate_max),
            heart_rate_min: update.heart_rate_min.unwrap_or(self.heart_rate_min),
            bp_systolic_max: update.bp_systolic_max.unwrap_or(self.bp_systolic_max),
            spo2_min: update.spo2_min.unwrap_or(self.spo2_min),
            temp_max: update.temp_max.unwrap_or(self.temp_max),
            temp_min: update.temp_min.unwrap_or(self.temp_min),
        }
    }
}

/// Fixed lower bound for systolic blood pressure classification
pub const BP_SYSTOLIC_MIN: f64 = 90.0;

/// Classify a value against a min/max band
///
/// Critical when the value strays more than 15% beyond either bound,
/// warning when merely outside the band, normal otherwise. Used for heart
/// rate, systolic blood pressure, and temperature.
pub fn check_vital_status(value: f64, min: f64, max: f64) -> VitalStatus {
    if value < min * 0.85 || value > max * 1.15 {
        VitalStatus::Critical
    } else if value < min || value > max {
        VitalStatus::Warning
    } else {
        VitalStatus::Normal
    }
}

/// Classify an SpO2 value
///
/// SpO2 has a single lower bound and no critical tier. The asymmetry is
/// intentional and must be preserved.
pub fn check_spo2_status(value: f64, spo2_min: f64) -> VitalStatus {
    if value < spo2_min {
        VitalStatus::Warning
    } else {
        VitalStatus::Normal
    }
}
