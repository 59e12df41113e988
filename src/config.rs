//! Configuration module for cloudvault.

use serde::Deserialize;
use std::path::Path;

use crate::{CloudError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/cloudvault.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per user.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Maximum size of a single uploaded file in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_data_root() -> String {
    "data/files".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

impl StorageConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Upload link configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// How long a successful unlock stays valid, in seconds.
    ///
    /// An unlock never outlives the link it belongs to.
    #[serde(default = "default_unlock_ttl")]
    pub unlock_ttl_secs: u64,
    /// Number of random bytes in a link token (hex encoded, so twice as many characters).
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
}

fn default_unlock_ttl() -> u64 {
    3600 // 1 hour
}

fn default_token_bytes() -> usize {
    32
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            unlock_ttl_secs: default_unlock_ttl(),
            token_bytes: default_token_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cloudvault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload link configuration.
    #[serde(default)]
    pub links: LinksConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(CloudError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(s).map_err(|e| CloudError::Config(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_root.trim().is_empty() {
            return Err(CloudError::Config("storage.data_root must be set".to_string()));
        }
        if self.links.token_bytes < 16 {
            return Err(CloudError::Config(
                "links.token_bytes must be at least 16".to_string(),
            ));
        }
        Ok(())
    }
}
