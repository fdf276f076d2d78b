//! Configuration management for vaultsync.
//!
//! Configuration values are resolved from several layers, in this
//! priority order:
//! 1. Environment variables
//! 2. Programmatically set values (command line flags)
//! 3. Values loaded from file
//! 4. Default values
//!
//! ## Example
//!
//! ```no_run
//! use vaultsync_core::config::AppConfig;
//!
//! let mut config = AppConfig::layered(None)?;
//! config.set("sync.workers", 4)?;
//! let app = AppConfig::from_config(&config)?;
//! assert_eq!(app.sync.workers, 4);
//! # Ok::<(), vaultsync_types::SyncError>(())
//! ```

use vaultsync_types::{LogConfig, Result, SyncError, SyncSettings, VaultSettings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

const LAYERS_BY_PRIORITY: [ConfigLayer; 4] = [
    ConfigLayer::Environment,
    ConfigLayer::Set,
    ConfigLayer::Loaded,
    ConfigLayer::Default,
];

/// How an environment variable's text is turned into a config value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvValue {
    /// Kept as a string
    Text,
    /// Parsed as a boolean ("1", "true", "yes" are true)
    Flag,
    /// Parsed as an unsigned integer
    Number,
}

/// Binding of an environment variable to a dotted config key.
#[derive(Debug, Clone, Copy)]
pub struct EnvBinding {
    /// Environment variable name
    pub var: &'static str,
    /// Dotted configuration key
    pub key: &'static str,
    /// Value conversion
    pub kind: EnvValue,
}

/// Low-level layered configuration store.
#[derive(Clone, Debug, Default)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
}

impl Config {
    /// Create a new configuration from a file path.
    ///
    /// If the file doesn't exist, an empty configuration is created.
    /// JSON files are accepted since JSON is a subset of YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut layers = HashMap::new();

        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| SyncError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

            let value: Value = serde_yaml::from_str(&content)
                .map_err(|e| SyncError::Config(format!("Failed to parse config {}: {}", path.display(), e)))?;

            if !value.is_null() {
                layers.insert(ConfigLayer::Loaded, value);
            }
        }

        Ok(Self {
            layers,
            file_path: Some(path.to_path_buf()),
        })
    }

    /// Path the configuration was loaded from, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Install the default layer from a serializable value.
    pub fn with_defaults(mut self, defaults: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(defaults)
            .map_err(|e| SyncError::Config(format!("Failed to serialize defaults: {}", e)))?;
        self.layers.insert(ConfigLayer::Default, value);
        Ok(self)
    }

    /// Populate the environment layer using `lookup` for each binding.
    pub fn with_env<F>(mut self, bindings: &[EnvBinding], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_layer = Value::Object(Default::default());

        for binding in bindings {
            let Some(raw) = lookup(binding.var) else {
                continue;
            };

            let value = match binding.kind {
                EnvValue::Text => Value::String(raw),
                EnvValue::Flag => Value::Bool(matches!(
                    raw.to_lowercase().as_str(),
                    "1" | "true" | "yes"
                )),
                EnvValue::Number => {
                    let n: u64 = raw.trim().parse().map_err(|_| {
                        SyncError::Config(format!("{} must be a number, got '{}'", binding.var, raw))
                    })?;
                    Value::from(n)
                }
            };

            Self::set_value_at_path(&mut env_layer, binding.key, value)?;
        }

        self.layers.insert(ConfigLayer::Environment, env_layer);
        Ok(self)
    }

    /// Get a configuration value by key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        for layer in &LAYERS_BY_PRIORITY {
            if let Some(value) = self.layers.get(layer).and_then(|data| get_value_at_path(data, key)) {
                if let Ok(typed_value) = serde_json::from_value(value.clone()) {
                    return Some(typed_value);
                }
            }
        }

        None
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| SyncError::Config(format!("Failed to serialize value: {}", e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert(Value::Object(Default::default()));

        Self::set_value_at_path(set_layer, key, value)
    }

    /// Get merged data from all layers.
    pub fn merged_data(&self) -> Value {
        let mut merged = Value::Object(serde_json::Map::new());

        for layer in LAYERS_BY_PRIORITY.iter().rev() {
            if let Some(layer_data) = self.layers.get(layer) {
                merged = crate::util::data::deep_merge(merged, layer_data.clone());
            }
        }

        merged
    }

    /// Deserialize the merged configuration into a typed structure.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.merged_data())
            .map_err(|e| SyncError::Config(format!("Failed to parse configuration: {}", e)))
    }

    // Helper: Set value at dotted path, creating intermediate objects
    fn set_value_at_path(data: &mut Value, path: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(SyncError::Config("Empty path".to_string()));
        };

        let mut current = data;
        for part in parents {
            if !current.is_object() {
                *current = Value::Object(Default::default());
            }
            current = match current {
                Value::Object(map) => map
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(Default::default())),
                _ => vaultsync_types::bug!("config node for '{}' is not an object", part),
            };
        }

        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        if let Value::Object(map) = current {
            map.insert(last.to_string(), value);
        }

        Ok(())
    }
}

// Helper: Get value at dotted path
fn get_value_at_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, part| current.get(part))
}

/// Environment variables understood by vaultsync.
pub const ENV_BINDINGS: &[EnvBinding] = &[
    EnvBinding { var: "VAULT_ADDR", key: "vault.address", kind: EnvValue::Text },
    EnvBinding { var: "VAULT_TOKEN", key: "vault.token", kind: EnvValue::Text },
    EnvBinding { var: "VAULT_NAMESPACE", key: "vault.namespace", kind: EnvValue::Text },
    EnvBinding { var: "VAULT_SKIP_VERIFY", key: "vault.insecure", kind: EnvValue::Flag },
    EnvBinding { var: "VAULTSYNC_CONFIGURATION_PATH", key: "sync.configuration_path", kind: EnvValue::Text },
    EnvBinding { var: "VAULTSYNC_SECRET_BASE_PATH", key: "sync.vault_secret_base_path", kind: EnvValue::Text },
    EnvBinding { var: "VAULTSYNC_WORKERS", key: "sync.workers", kind: EnvValue::Number },
];

/// Fully resolved application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection
    #[serde(default)]
    pub vault: VaultSettings,
    /// Sync behaviour
    #[serde(default)]
    pub sync: SyncSettings,
    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Build the layered store: defaults, the config file and the process environment.
    ///
    /// When `path` is `None` the default location is used; a missing file is not an error.
    pub fn layered(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        Config::load(&path)?
            .with_defaults(&AppConfig::default())?
            .with_env(ENV_BINDINGS, |var| std::env::var(var).ok())
    }

    /// Resolve and validate an application configuration from a layered store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let app: AppConfig = config.extract()?;
        app.validate()?;
        Ok(app)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.sync.workers == 0 {
            return Err(SyncError::Config("sync.workers must be at least 1".to_string()));
        }
        if self.sync.confirm_attempts == 0 {
            return Err(SyncError::Config("sync.confirm_attempts must be at least 1".to_string()));
        }
        if self.vault.address.trim().is_empty() {
            return Err(SyncError::Config("vault.address must not be empty".to_string()));
        }
        Ok(())
    }

    /// Get the default path for the configuration file.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".vaultsync").join("config.yml"))
            .ok_or_else(|| SyncError::Config("Could not determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_layers() {
        let mut config = Config::default();

        config.layers.insert(
            ConfigLayer::Default,
            serde_json::json!({"key": "default_value"}),
        );
        config.layers.insert(
            ConfigLayer::Loaded,
            serde_json::json!({"key": "loaded_value"}),
        );

        let value: String = config.get("key").unwrap();
        assert_eq!(value, "loaded_value");

        config.set("key", "set_value").unwrap();
        let value: String = config.get("key").unwrap();
        assert_eq!(value, "set_value");
    }

    #[test]
    fn test_env_layer_wins() {
        let config = Config::default()
            .with_defaults(&AppConfig::default())
            .unwrap()
            .with_env(ENV_BINDINGS, |var| match var {
                "VAULT_ADDR" => Some("http://vault:8200".to_string()),
                "VAULTSYNC_WORKERS" => Some("4".to_string()),
                "VAULT_SKIP_VERIFY" => Some("true".to_string()),
                _ => None,
            })
            .unwrap();

        let app = AppConfig::from_config(&config).unwrap();
        assert_eq!(app.vault.address, "http://vault:8200");
        assert_eq!(app.sync.workers, 4);
        assert!(app.vault.insecure);
        assert_eq!(app.sync.vault_secret_base_path, "secret/vaultsync/");
    }

    #[test]
    fn test_env_number_must_parse() {
        let result = Config::default().with_env(ENV_BINDINGS, |var| {
            (var == "VAULTSYNC_WORKERS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_file_and_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sync:\n  configuration_path: /etc/vaultsync\n  workers: 2\nlog:\n  format: json").unwrap();

        let mut config = Config::load(file.path())
            .unwrap()
            .with_defaults(&AppConfig::default())
            .unwrap();
        config.set("sync.workers", 8).unwrap();

        let app = AppConfig::from_config(&config).unwrap();
        assert_eq!(app.sync.configuration_path, PathBuf::from("/etc/vaultsync"));
        assert_eq!(app.sync.workers, 8);
        assert_eq!(app.log.format, vaultsync_types::LogFormat::Json);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let config = Config::load("/nonexistent/vaultsync/config.yml").unwrap();
        assert!(config.get::<String>("vault.address").is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default().with_defaults(&AppConfig::default()).unwrap();
        config.set("sync.workers", 0).unwrap();
        assert!(AppConfig::from_config(&config).is_err());
    }
}
