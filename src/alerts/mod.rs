//! Critical-alert detection and delivery
//!
//! Snapshot changes are evaluated against the alert state machine; when a
//! heart-rate or SpO2 reading goes critical outside the cooldown window, a
//! notification is emitted through the [`Notifier`] seam.

mod cooldown;
mod evaluator;
mod notifier;

pub use cooldown::Cooldown;
pub use evaluator::{AlertEvaluator, CriticalAlert};
pub use notifier::{LogNotifier, Notifier};

#[cfg(test)]
pub(crate) use notifier::test_support;
