//! Configuration loading for the message gate.
//!
//! Configuration is loaded from a TOML file. Every section and field is
//! optional; missing values fall back to the defaults below.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the gate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfig {
    /// Dedup ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Ledger cleanup task configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Freshness filter configuration.
    #[serde(default)]
    pub freshness: FreshnessConfig,
}

/// Dedup ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// How long a message id is remembered, in milliseconds (default: 5 minutes).
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// Hard cap on remembered ids (default: 1000).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Cleanup interval in seconds (default: 60).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Enable cleanup task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

/// Freshness filter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
    /// Messages this old or older are dropped, in milliseconds (default: 5000).
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
}

// Default value functions
fn default_retention_ms() -> u64 {
    5 * 60 * 1000 // 5 minutes
}

fn default_capacity() -> usize {
    1000
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_max_age_ms() -> u64 {
    5000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_ms: default_retention_ms(),
            capacity: default_capacity(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            max_age_ms: default_max_age_ms(),
        }
    }
}

impl CleanupConfig {
    /// Sleep between cleanup passes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Toml(source) => ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would disable a safety bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "ledger.capacity",
                reason: "must be > 0".into(),
            });
        }
        if self.ledger.retention_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "ledger.retention_ms",
                reason: "must be > 0".into(),
            });
        }
        if self.cleanup.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup.interval_secs",
                reason: "must be > 0".into(),
            });
        }
        if self.freshness.max_age_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "freshness.max_age_ms",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to parse configuration text.
    #[error("failed to parse config: {0}")]
    Toml(#[source] toml::de::Error),
    /// A value is out of range.
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Dotted key of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
