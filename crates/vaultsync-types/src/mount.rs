//! Wire types exchanged with the backend's mount and secret endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tuning parameters shared by auth methods and secrets engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneConfig {
    /// Default lease TTL (e.g. "1h")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lease_ttl: Option<String>,
    /// Maximum lease TTL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lease_ttl: Option<String>,
    /// Listing visibility ("unauth" or "hidden")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_visibility: Option<String>,
}

/// Options used to enable a mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableOptions {
    /// Mount type (e.g. "ldap", "aws")
    #[serde(rename = "type")]
    pub mount_type: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Tuning parameters
    #[serde(default)]
    pub config: TuneConfig,
    /// Type specific mount options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

impl EnableOptions {
    /// Body written to a mount's `tune` endpoint.
    pub fn tune_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(ttl) = &self.config.default_lease_ttl {
            body.insert("default_lease_ttl".to_string(), Value::String(ttl.clone()));
        }
        if let Some(ttl) = &self.config.max_lease_ttl {
            body.insert("max_lease_ttl".to_string(), Value::String(ttl.clone()));
        }
        if let Some(visibility) = &self.config.listing_visibility {
            body.insert("listing_visibility".to_string(), Value::String(visibility.clone()));
        }
        body.insert("description".to_string(), Value::String(self.description.clone()));
        body
    }
}

/// A live mount as reported by the backend's mount tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInfo {
    /// Mount type
    #[serde(rename = "type")]
    pub mount_type: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Type specific options (for `kv`, the `version` key)
    #[serde(default)]
    pub options: Option<HashMap<String, String>>,
}

impl MountInfo {
    /// Convenience constructor.
    pub fn new(mount_type: impl Into<String>) -> Self {
        Self {
            mount_type: mount_type.into(),
            ..Default::default()
        }
    }

    /// Attach a single option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A secret returned by a read or write call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretResponse {
    /// Response payload
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Warnings attached by the backend
    #[serde(default, deserialize_with = "null_as_empty")]
    pub warnings: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
