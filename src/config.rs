//! Crate configuration
//!
//! Loaded from a JSON file such as:
//!
//! ```json
//! { "batch": { "max_operations": 50 }, "log_level": "trace" }
//! ```
//!
//! Missing keys take their defaults. Loading validates every section and
//! applying the config sets the process-wide log floor.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::batch::{BatchConfig, BatchError};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid config JSON
    #[error("Malformed config {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A section failed validation
    #[error("Invalid config: {0}")]
    Invalid(#[from] BatchError),
}

impl ConfigError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Unreadable { .. } => "TABLE_CONFIG_UNREADABLE",
            ConfigError::Malformed { .. } => "TABLE_CONFIG_MALFORMED",
            ConfigError::Invalid(_) => "TABLE_CONFIG_INVALID",
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AeroTableConfig {
    pub batch: BatchConfig,
    pub log_level: Severity,
}

impl Default for AeroTableConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            log_level: Severity::Info,
        }
    }
}

impl AeroTableConfig {
    /// Reads and validates a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: display.clone(),
            source,
        })?;
        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("log_level", config.log_level.as_str()),
                ("path", display.as_str()),
            ],
        );
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.batch.validate()?;
        Ok(())
    }

    /// Applies process-wide settings
    pub fn apply(&self) {
        Logger::set_min_severity(self.log_level);
    }
}
