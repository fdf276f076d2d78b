//! Core trait definitions for vaultsync abstractions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use crate::errors::Result;
use crate::mount::{EnableOptions, MountInfo, SecretResponse};

/// Facade over a Vault compatible backend.
///
/// Every call is one logical operation against the backend. Paths are
/// relative to the API root (no `/v1/` prefix). Implementations must be
/// shareable between the coordinator and the write workers.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Read a path. Returns `None` if nothing exists there.
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>>;

    /// Write (upsert) data at a path.
    ///
    /// Returns the response secret for endpoints that produce one.
    async fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<SecretResponse>>;

    /// List keys below a path. Returns `None` if the path has no children.
    async fn list(&self, path: &str) -> Result<Option<Vec<String>>>;

    /// Delete a path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// List enabled secrets engines, keyed by normalized mount path.
    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>>;

    /// List enabled auth methods, keyed by normalized mount path.
    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>>;

    /// Enable a secrets engine at `path`.
    async fn enable_mount(&self, path: &str, options: &EnableOptions) -> Result<()>;

    /// Enable an auth method at `path`.
    async fn enable_auth(&self, path: &str, options: &EnableOptions) -> Result<()>;
}
