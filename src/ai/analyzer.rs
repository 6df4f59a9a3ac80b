use crate::ai::backends::AnalysisBackend;
use crate::error::AnalysisError;
use crate::vitals::VitalsSnapshot;
use log::{error, info, warn};
use std::sync::Arc;

/// Fallback shown when no API key is configured
pub const MISSING_KEY_FALLBACK: &str = "AI analysis unavailable (Missing API Key)";

/// Fallback shown when the backend call fails for any other reason
pub const FAILURE_FALLBACK: &str = "AI analysis failed. Please consult a doctor immediately.";

/// Format a vitals snapshot into a prompt for the assessment backend
///
/// Embeds all four monitored signals and asks for a short, urgent
/// assessment suitable for a caregiver notification.
pub fn format_prompt(vitals: &VitalsSnapshot) -> String {
    format!(
        "Act as a medical alert assistant. A senior patient's wearable reports: \
Heart Rate: {} bpm, Blood Pressure: {}/{} mmHg, SpO2: {}%, Temperature: {}\u{b0}C. \
Provide a concise, urgent assessment of the risk in 2 sentences maximum.",
        vitals.heart_rate.value,
        vitals.blood_pressure.systolic,
        vitals.blood_pressure.diastolic,
        vitals.spo2.value,
        vitals.temperature.value
    )
}

/// Coordinates risk assessment of critical vitals through an AI backend
///
/// The analyzer itself never fails: backend errors are mapped to fixed
/// fallback messages so the alerting path always has something to deliver.
pub struct RiskAnalyzer {
    backend: Arc<dyn AnalysisBackend>,
}

impl RiskAnalyzer {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    /// Assess the risk posed by the given vitals
    ///
    /// Returns the backend's assessment text, or a fallback message when
    /// the backend is unconfigured or unreachable.
    pub async fn analyze(&self, vitals: &VitalsSnapshot) -> String {
        info!(
            "Starting risk assessment for vitals: HR={} SpO2={}",
            vitals.heart_rate.value, vitals.spo2.value
        );

        match self.backend.assess(vitals).await {
            Ok(text) => {
                info!("Risk assessment completed: '{}'", text);
                text
            }
            Err(AnalysisError::MissingApiKey) => {
                warn!("Risk assessment skipped: no API key configured");
                MISSING_KEY_FALLBACK.to_string()
            }
            Err(e) => {
                error!("Risk assessment failed: {}", e);
                FAILURE_FALLBACK.to_string()
            }
        }
    }
}
