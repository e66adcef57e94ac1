//! Configuration for the Ridewatch fusion agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the fusion agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port the ingestion server binds to
    pub listen_port: u16,

    /// Base URL of the notification gateway
    pub push_base_url: String,

    /// Bearer token for the notification gateway
    pub push_token: String,

    /// Per-send push timeout in seconds
    pub push_timeout_secs: u64,

    /// Subscriber ids linked with notifications enabled at startup
    pub subscribers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: 7777,
            push_base_url: "http://127.0.0.1:8099".to_string(),
            push_token: String::new(),
            push_timeout_secs: 5,
            subscribers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ridewatch-agent")
            .join("config.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
