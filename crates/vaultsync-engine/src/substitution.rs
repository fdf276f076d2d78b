//! Secret substitution for configuration text.
//!
//! Placeholders have the form `%{token}%` with `token` matching
//! `[a-zA-Z0-9_]+`. Values come from the KV secret stored at
//! `<base path><logical path>`. Every `%{key}%` naming a secret key is
//! replaced, whatever characters the key holds. The result is then
//! re-scanned, and any placeholder still present (including one carried in
//! by a secret value) fails the whole text. The error lists every
//! unresolved token.

use crate::kv::KvPathAdapter;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vaultsync_types::{KvVersion, Result, SyncError, VaultBackend};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{([a-zA-Z0-9_]+)\}%").expect("placeholder pattern is valid"));

/// Any `%{...}%`, so secret keys outside the placeholder alphabet still resolve.
static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%\{([^{}%]+)\}%").expect("reference pattern is valid"));

/// Whether `text` references a secret key at all.
pub fn has_placeholders(text: &str) -> bool {
    REFERENCE.is_match(text)
}

/// Flat string values resolved from one secret path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretSet {
    path: String,
    values: HashMap<String, String>,
}

impl SecretSet {
    /// Build a set from explicit values.
    pub fn new(path: impl Into<String>, values: HashMap<String, String>) -> Self {
        Self {
            path: path.into(),
            values,
        }
    }

    /// A set with no values, used when the secret path does not exist.
    pub fn empty(path: impl Into<String>) -> Self {
        Self::new(path, HashMap::new())
    }

    /// Full secret path the values were read from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every placeholder in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Substitution`] naming each unresolved
    /// placeholder once, in order of first appearance.
    pub fn substitute(&self, text: &str) -> Result<String> {
        let rendered = REFERENCE.replace_all(text, |caps: &Captures| match self.values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        });

        let mut missing: Vec<String> = Vec::new();
        for token in PLACEHOLDER.find_iter(&rendered) {
            let token = token.as_str().to_string();
            if !missing.contains(&token) {
                missing.push(token);
            }
        }

        if !missing.is_empty() {
            return Err(SyncError::Substitution {
                path: self.path.clone(),
                tokens: missing,
            });
        }

        Ok(rendered.into_owned())
    }
}

/// Resolves placeholders against secrets stored under a base path.
#[derive(Clone)]
pub struct Substitutor {
    kv: KvPathAdapter,
    base_path: String,
}

impl Substitutor {
    /// Create a substitutor reading secrets below `base_path`.
    pub fn new(backend: Arc<dyn VaultBackend>, base_path: impl Into<String>) -> Self {
        Self {
            kv: KvPathAdapter::new(backend),
            base_path: base_path.into(),
        }
    }

    /// Full secret path for a resource's logical path.
    pub fn secret_path(&self, logical: &str) -> String {
        format!("{}{}", self.base_path, logical.trim_start_matches('/'))
    }

    /// Fetch the secrets for `logical`.
    ///
    /// A path with no secret yields an empty set.
    pub async fn fetch(&self, logical: &str) -> Result<SecretSet> {
        let path = self.secret_path(logical);
        let (location, secret) = self.kv.read(&path).await?;

        let Some(secret) = secret else {
            debug!("No secrets found at [{}]", path);
            return Ok(SecretSet::empty(path));
        };

        for warning in &secret.warnings {
            warn!("Read secret warning: {}", warning);
        }

        let values = match location.version {
            KvVersion::V1 => flatten(&path, &secret.data)?,
            KvVersion::V2 => match secret.data.get("data") {
                Some(Value::Object(inner)) => flatten(&path, inner)?,
                None | Some(Value::Null) => HashMap::new(),
                Some(other) => {
                    return Err(SyncError::SecretFormat(format!(
                        "Secret [{}] has a non-object data field: {}",
                        path, other
                    )))
                }
            },
        };

        debug!("Loaded {} secret value(s) from [{}]", values.len(), path);
        Ok(SecretSet::new(path, values))
    }

    /// Substitute placeholders in `text` using the secrets for `logical`.
    ///
    /// Text without placeholders is returned unchanged and no secret is read.
    pub async fn render(&self, text: &str, logical: &str) -> Result<String> {
        if !has_placeholders(text) {
            return Ok(text.to_string());
        }
        self.fetch(logical).await?.substitute(text)
    }
}

fn flatten(path: &str, data: &Map<String, Value>) -> Result<HashMap<String, String>> {
    data.iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key.clone(), s.clone())),
            other => Err(SyncError::SecretFormat(format!(
                "Secret [{}] key '{}' is not a string: {}",
                path, key, other
            ))),
        })
        .collect()
}
