use thiserror::Error;

/// Errors that can occur in the persistence store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Corrupt persisted record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during AI risk analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("Backend communication failed: {0}")]
    BackendError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors that can occur when delivering alerts
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to deliver notification: {0}")]
    NotificationFailed(String),
}

/// Errors that can occur while forwarding a chat message
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Webhook returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors that can occur during device pairing
#[derive(Error, Debug)]
pub enum PairingError {
    #[error("Pairing transport unavailable: {0}")]
    Unavailable(String),

    #[error("Pairing cancelled by user")]
    Cancelled,
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
