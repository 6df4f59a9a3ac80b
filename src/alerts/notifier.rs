use crate::error::AlertError;
use log::{error, warn};

/// Delivery seam for user-visible notifications
///
/// The evaluator emits through this trait so delivery can be swapped out
/// (and captured in tests) without touching the alerting logic.
pub trait Notifier: Send {
    /// Deliver an immediate critical notification
    fn critical(&self, message: &str) -> Result<(), AlertError>;

    /// Deliver a follow-up message, e.g. the AI risk assessment
    fn follow_up(&self, message: &str) -> Result<(), AlertError>;
}

/// Notifier that writes to the application log
///
/// Criticals go to the error level so they stand out in filtered output.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn critical(&self, message: &str) -> Result<(), AlertError> {
        error!("{}", message);
        Ok(())
    }

    fn follow_up(&self, message: &str) -> Result<(), AlertError> {
        warn!("{}", message);
        Ok(())
    }
}
