//! Error types for whitelist loading and history persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading the whitelist configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file at the given path.
    #[error("no config file at {}", .0.display())]
    Missing(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has the wrong shape.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failures while loading or saving the device history record.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// True when the config file simply does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(self, ConfigError::Missing(_))
    }
}
