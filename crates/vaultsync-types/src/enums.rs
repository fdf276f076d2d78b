//! Common enumerations used throughout vaultsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{SyncError, Result};

/// Log level enumeration for the logging system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Detailed trace messages
    Trace,
}

impl FromStr for LogLevel {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(SyncError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format with colors
    Pretty,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

impl FromStr for LogFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(SyncError::Validation(format!("Invalid log format: {}", s))),
        }
    }
}

/// Wire protocol version of a key-value mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvVersion {
    /// Flat key-value store
    V1,
    /// Versioned key-value store (paths gain a `data/` segment)
    V2,
}

impl KvVersion {
    /// Derive the version from a mount's options map.
    ///
    /// Anything other than an explicit `version: "2"` is version 1.
    pub fn from_options(options: Option<&std::collections::HashMap<String, String>>) -> Self {
        match options.and_then(|o| o.get("version")).map(String::as_str) {
            Some("2") => KvVersion::V2,
            _ => KvVersion::V1,
        }
    }
}

impl fmt::Display for KvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvVersion::V1 => write!(f, "1"),
            KvVersion::V2 => write!(f, "2"),
        }
    }
}

/// Resource kinds managed by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Auth method mounted under `sys/auth`
    AuthMethod,
    /// AWS secrets engine
    AwsSecretsEngine,
    /// GCP secrets engine
    GcpSecretsEngine,
}

impl ResourceKind {
    /// Backend mount type owned by this kind, if it owns exactly one.
    pub fn mount_type(&self) -> Option<&'static str> {
        match self {
            ResourceKind::AuthMethod => None,
            ResourceKind::AwsSecretsEngine => Some("aws"),
            ResourceKind::GcpSecretsEngine => Some("gcp"),
        }
    }

    /// Whether live mounts of `mount_type` support root credential rotation.
    pub fn supports_rotation(mount_type: &str) -> bool {
        matches!(mount_type, "aws" | "gcp")
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::AuthMethod => write!(f, "auth method"),
            ResourceKind::AwsSecretsEngine => write!(f, "AWS secrets engine"),
            ResourceKind::GcpSecretsEngine => write!(f, "GCP secrets engine"),
        }
    }
}
