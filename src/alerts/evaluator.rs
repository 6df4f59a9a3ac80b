use crate::alerts::Cooldown;
use crate::vitals::{Timestamp, VitalStatus, VitalsSnapshot};
use chrono::Utc;
use log::debug;

/// A critical condition detected in the current snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalAlert {
    /// Human-readable notification message
    pub message: String,
    /// The snapshot that triggered the alert, for downstream analysis
    pub snapshot: VitalsSnapshot,
}

/// Watches snapshot changes and raises deduplicated critical alerts
///
/// Two states: idle and cooling-down. While cooling down every snapshot is
/// skipped outright; when idle, a critical heart-rate or SpO2 status fires
/// an alert and enters the cooldown. Heart rate takes precedence when both
/// are critical. Blood pressure and temperature criticality never trigger
/// this path.
#[derive(Debug)]
pub struct AlertEvaluator {
    cooldown: Cooldown,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(Cooldown::default())
    }
}

impl AlertEvaluator {
    pub fn new(cooldown: Cooldown) -> Self {
        Self { cooldown }
    }

    /// Evaluate a snapshot change against the current time
    pub fn evaluate(&mut self, snapshot: &VitalsSnapshot) -> Option<CriticalAlert> {
        self.evaluate_at(snapshot, Utc::now())
    }

    /// Evaluate a snapshot change at a specific instant
    ///
    /// Primarily used for testing with controlled timestamps.
    pub fn evaluate_at(
        &mut self,
        snapshot: &VitalsSnapshot,
        now: Timestamp,
    ) -> Option<CriticalAlert> {
        if !self.cooldown.ready_at(now) {
            debug!("Alert cooldown active, skipping evaluation");
            return None;
        }

        let message = if snapshot.heart_rate.status == VitalStatus::Critical {
            format!(
                "CRITICAL: Heart Rate is {} bpm!",
                snapshot.heart_rate.value
            )
        } else if snapshot.spo2.status == VitalStatus::Critical {
            format!("CRITICAL: SpO2 is low ({}%)!", snapshot.spo2.value)
        } else {
            return None;
        };

        self.cooldown.fire_at(now);
        Some(CriticalAlert {
            message,
            snapshot: snapshot.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn critical_heart_rate_snapshot(value: f64) -> VitalsSnapshot {
        let mut snapshot = VitalsSnapshot::default();
        snapshot.heart_rate.value = value;
        snapshot.heart_rate.status = VitalStatus::Critical;
        snapshot
    }

    #[test]
    fn test_normal_snapshot_produces_no_alert() {
        let mut evaluator = AlertEvaluator::default();
        assert!(evaluator.evaluate(&VitalsSnapshot::default()).is_none());
    }

    #[test]
    fn test_critical_heart_rate_alert_message() {
        let mut evaluator = AlertEvaluator::default();
        let alert = evaluator
            .evaluate(&critical_heart_rate_snapshot(150.0))
            .unwrap();
        assert_eq!(alert.message, "CRITICAL: Heart Rate is 150 bpm!");
        assert_eq!(alert.snapshot.heart_rate.value, 150.0);
    }

    #[test]
    fn test_critical_spo2_alert_message() {
        let mut evaluator = AlertEvaluator::default();
        let mut snapshot = VitalsSnapshot::default();
        snapshot.spo2.value = 82.0;
        snapshot.spo2.status = VitalStatus::Critical;

        let alert = evaluator.evaluate(&snapshot).unwrap();
        assert_eq!(alert.message, "CRITICAL: SpO2 is low (82%)!");
    }

    #[test]
    fn test_heart_rate_takes_precedence_over_spo2() {
        let mut evaluator = AlertEvaluator::default();
        let mut snapshot = critical_heart_rate_snapshot(150.0);
        snapshot.spo2.status = VitalStatus::Critical;

        let alert = evaluator.evaluate(&snapshot).unwrap();
        assert!(alert.message.contains("Heart Rate"));
    }

    #[test]
    fn test_blood_pressure_and_temperature_never_trigger() {
        let mut evaluator = AlertEvaluator::default();
        let mut snapshot = VitalsSnapshot::default();
        snapshot.blood_pressure.status = VitalStatus::Critical;
        snapshot.temperature.status = VitalStatus::Critical;

        assert!(evaluator.evaluate(&snapshot).is_none());
    }

    #[test]
    fn test_cooldown_deduplicates_consecutive_criticals() {
        let mut evaluator = AlertEvaluator::default();
        let snapshot = critical_heart_rate_snapshot(150.0);
        let now = Utc::now();

        // Two criticals within the window produce exactly one alert
        assert!(evaluator.evaluate_at(&snapshot, now).is_some());
        assert!(evaluator
            .evaluate_at(&snapshot, now + Duration::seconds(3))
            .is_none());

        // A third after the window produces a second alert
        assert!(evaluator
            .evaluate_at(&snapshot, now + Duration::seconds(11))
            .is_some());
    }

    #[test]
    fn test_critical_path_delivers_through_notifier() {
        use crate::alerts::test_support::RecordingNotifier;
        use crate::alerts::Notifier;

        let notifier = RecordingNotifier::default();
        let mut evaluator = AlertEvaluator::default();
        let snapshot = critical_heart_rate_snapshot(150.0);
        let now = Utc::now();

        for offset in [0, 3, 11] {
            if let Some(alert) = evaluator.evaluate_at(&snapshot, now + Duration::seconds(offset)) {
                notifier.critical(&alert.message).unwrap();
            }
        }

        let criticals = notifier.criticals.lock().unwrap();
        assert_eq!(criticals.len(), 2);
        assert_eq!(criticals[0], "CRITICAL: Heart Rate is 150 bpm!");
    }

    #[test]
    fn test_cooldown_skips_evaluation_entirely() {
        let mut evaluator = AlertEvaluator::default();
        let now = Utc::now();

        evaluator
            .evaluate_at(&critical_heart_rate_snapshot(150.0), now)
            .unwrap();

        // Even a different critical signal is skipped while cooling down
        let mut snapshot = VitalsSnapshot::default();
        snapshot.spo2.status = VitalStatus::Critical;
        assert!(evaluator
            .evaluate_at(&snapshot, now + Duration::seconds(5))
            .is_none());
    }
}
