/// Error types for the vitals monitor
pub mod error;

/// Vital sign types, thresholds, and status classification
pub mod vitals;

/// Persistence for history and thresholds
pub mod store;

/// Vitals state engine
pub mod engine;

/// Synthetic vitals generation
pub mod simulator;

/// Critical-alert detection and delivery
pub mod alerts;

/// Risk analyzer and backend implementations
pub mod ai;

/// Chat assistant webhook relay
pub mod chat;

/// Device pairing
pub mod pairing;

/// Configuration management
pub mod config;

// Re-export commonly used types
pub use error::{AlertError, AnalysisError, ChatError, ConfigError, PairingError, StoreError};
