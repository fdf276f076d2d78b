//! Type-safe identifiers for backend paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::{SyncError, Result};

/// A normalized mount path.
///
/// Mount paths never start with a slash and always end with exactly one,
/// which is how the backend reports them in its mount tables.
///
/// # Example
///
/// ```
/// use vaultsync_types::MountPath;
///
/// let path = MountPath::new("gcp-prod").unwrap();
/// assert_eq!(path.as_str(), "gcp-prod/");
/// assert_eq!(path.join("roleset/viewer"), "gcp-prod/roleset/viewer");
///
/// assert!(MountPath::new("").is_err());
/// assert!(MountPath::new("a//b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MountPath(String);

impl MountPath {
    /// Create a new normalized mount path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty or contains empty segments.
    pub fn new(path: impl AsRef<str>) -> Result<Self> {
        let trimmed = path.as_ref().trim().trim_matches('/');
        if trimmed.is_empty() || trimmed.split('/').any(|s| s.is_empty()) {
            return Err(SyncError::Validation(format!(
                "Invalid mount path '{}': must contain at least one non-empty segment",
                path.as_ref()
            )));
        }
        Ok(Self(format!("{}/", trimmed)))
    }

    /// Get the path as a string slice, including the trailing slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the path without its trailing slash.
    pub fn trimmed(&self) -> &str {
        self.0.trim_end_matches('/')
    }

    /// Append a relative path below this mount.
    pub fn join(&self, rest: &str) -> String {
        format!("{}{}", self.0, rest.trim_start_matches('/'))
    }

    /// Check whether `path` lives under this mount.
    pub fn contains(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        path.starts_with(&self.0) || path == self.trimmed()
    }
}

impl fmt::Display for MountPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MountPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for MountPath {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MountPath> for String {
    fn from(path: MountPath) -> Self {
        path.0
    }
}

impl AsRef<str> for MountPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
