//! KV-version aware path adaptation.
//!
//! Version 2 mounts insert a literal `data/` segment after the mount path
//! and wrap written payloads in a `data` object. Every KV access goes
//! through [`KvPathAdapter`] so callers never hardcode either shape.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use vaultsync_types::{KvVersion, MountPath, Result, SecretResponse, SyncError, VaultBackend};

/// Where a KV path lives and how to address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvLocation {
    /// Owning mount
    pub mount: MountPath,
    /// Protocol version of the mount
    pub version: KvVersion,
    /// Path to use on the wire
    pub path: String,
}

/// Routes KV reads and writes to the right wire shape.
#[derive(Clone)]
pub struct KvPathAdapter {
    backend: Arc<dyn VaultBackend>,
}

impl KvPathAdapter {
    /// Create an adapter over `backend`.
    pub fn new(backend: Arc<dyn VaultBackend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn VaultBackend> {
        &self.backend
    }

    /// Find the mount that owns `path` and compute the wire path.
    ///
    /// The longest mount prefix wins, so `secret/team/` owns
    /// `secret/team/app` even when `secret/` is also mounted.
    pub async fn locate(&self, path: &str) -> Result<KvLocation> {
        let path = path.trim_start_matches('/');
        let mounts = self.backend.list_mounts().await?;

        let (mount, info) = mounts
            .iter()
            .filter_map(|(name, info)| MountPath::new(name).ok().map(|m| (m, info)))
            .filter(|(mount, _)| mount.contains(path))
            .max_by_key(|(mount, _)| mount.as_str().len())
            .ok_or_else(|| SyncError::MountNotFound(path.to_string()))?;

        if info.mount_type != "kv" {
            return Err(SyncError::NotAKvMount(mount.to_string()));
        }

        let version = KvVersion::from_options(info.options.as_ref());
        let routed = route(path, &mount, version);
        debug!("KV path [{}] is on mount [{}] (v{}), using [{}]", path, mount, version, routed);

        Ok(KvLocation {
            mount,
            version,
            path: routed,
        })
    }

    /// Read a KV secret, returning the location it was read from.
    pub async fn read(&self, path: &str) -> Result<(KvLocation, Option<SecretResponse>)> {
        let location = self.locate(path).await?;
        let secret = self.backend.read(&location.path).await?;
        Ok((location, secret))
    }

    /// Write a flat KV secret.
    pub async fn write(&self, path: &str, data: Map<String, Value>) -> Result<KvLocation> {
        let location = self.locate(path).await?;
        let body = match location.version {
            KvVersion::V1 => data,
            KvVersion::V2 => {
                let mut wrapped = Map::new();
                wrapped.insert("data".to_string(), Value::Object(data));
                wrapped
            }
        };
        self.backend.write(&location.path, &body).await?;
        Ok(location)
    }
}

/// Rewrite `path` for the wire shape of a mount at `mount`.
pub fn route(path: &str, mount: &MountPath, version: KvVersion) -> String {
    let path = path.trim_start_matches('/');
    match version {
        KvVersion::V1 => path.to_string(),
        KvVersion::V2 => {
            let rest = path.strip_prefix(mount.as_str()).unwrap_or("");
            mount.join(&format!("data/{}", rest))
        }
    }
}
