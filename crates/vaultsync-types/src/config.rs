//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::enums::{LogFormat, LogLevel};

/// Connection settings for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSettings {
    /// Vault URL
    #[serde(default = "default_address")]
    pub address: String,
    /// Vault token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Vault namespace (for enterprise Vault)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Whether to skip TLS verification (insecure)
    #[serde(default)]
    pub insecure: bool,
}

fn default_address() -> String {
    "https://127.0.0.1:8200".to_string()
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            namespace: None,
            insecure: false,
        }
    }
}

/// Settings that drive a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Root of the configuration tree
    #[serde(default = "default_configuration_path")]
    pub configuration_path: PathBuf,
    /// Prefix under which substitution secrets are stored
    #[serde(default = "default_secret_base_path")]
    pub vault_secret_base_path: String,
    /// Number of concurrent write workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Invalid answers tolerated per delete prompt
    #[serde(default = "default_confirm_attempts")]
    pub confirm_attempts: u32,
}

fn default_configuration_path() -> PathBuf {
    PathBuf::from("./config")
}

fn default_secret_base_path() -> String {
    "secret/vaultsync/".to_string()
}

fn default_workers() -> usize {
    10
}

fn default_confirm_attempts() -> u32 {
    3
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            configuration_path: default_configuration_path(),
            vault_secret_base_path: default_secret_base_path(),
            workers: default_workers(),
            confirm_attempts: default_confirm_attempts(),
        }
    }
}

/// Log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level emitted when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Optional file to write logs to instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}
