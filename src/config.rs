//! TOML configuration loading and validation

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
///
/// Every section is optional; omitted sections and fields fall back to
/// defaults that match a fresh installation.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub simulation: SimulationConfig,
    pub alerts: AlertsConfig,
    pub ai: AiBackendConfig,
    pub chat: ChatConfig,
}

/// Where persisted history and thresholds live
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Synthetic reading generation
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { interval_ms: 3000 }
    }
}

impl SimulationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Critical-alert deduplication
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsConfig {
    pub cooldown_ms: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self { cooldown_ms: 10_000 }
    }
}

/// AI assessment backend selection
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum AiBackendConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
    },
    Mock,
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

impl Default for AiBackendConfig {
    fn default() -> Self {
        Self::Gemini {
            api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}

/// Chat assistant webhook relay
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Webhook to forward chat messages to; chat is disabled when unset
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that configured values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.interval_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(url) = &self.chat.webhook_url {
            if url.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "chat.webhook_url must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}
