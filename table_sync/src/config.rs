//! Configuration handling for table_sync

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse(&config_str)
}

/// Parse configuration from TOML text
pub fn parse(config_str: &str) -> Result<Config> {
    toml::from_str(config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))
}

/// Represents the complete table_sync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub type_mapping: TypeMappingConfig,
    pub logging: Option<LoggingConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Synchronization behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Permit destructive column drops
    #[serde(default)]
    pub dangerous_sync: bool,
    #[serde(default = "default_backup_directory")]
    pub backup_directory: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dangerous_sync: false,
            backup_directory: default_backup_directory(),
        }
    }
}

fn default_backup_directory() -> String {
    "./backups".to_string()
}

/// Type mapping configuration
///
/// Keys of `override_` are abstract field type names (`String`, `Object`, ...),
/// values are the native column type to use instead of the built-in one.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TypeMappingConfig {
    pub override_: Option<HashMap<String, String>>,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}
