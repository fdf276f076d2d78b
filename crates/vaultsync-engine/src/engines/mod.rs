//! Secrets engine declarations and reconcilers.

mod aws;
mod gcp;

pub use aws::{AwsConfigLease, AwsEngine, AwsEngineFile, AwsReconciler, AwsRole, AwsRootConfig};
pub use gcp::{
    GcpBinding, GcpConfigLease, GcpCredentials, GcpEngine, GcpEngineFile, GcpReconciler, GcpRoleSet,
    GcpRootConfig,
};

use crate::tasks::DeleteTask;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use vaultsync_types::{EnableOptions, MountInfo, MountPath, Result, TuneConfig, VaultBackend};

/// Optional `mount_options` block of an engine file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MountOptions {
    /// Mount description
    #[serde(default)]
    pub description: String,
    /// Tuning parameters
    #[serde(default)]
    pub config: TuneConfig,
    /// Type specific mount options
    #[serde(default)]
    pub options: Option<HashMap<String, String>>,
}

impl MountOptions {
    /// Enable options for a mount of `mount_type`.
    pub fn enable_options(&self, mount_type: &str) -> EnableOptions {
        EnableOptions {
            mount_type: mount_type.to_string(),
            description: self.description.clone(),
            config: self.config.clone(),
            options: self.options.clone(),
        }
    }
}

/// Live mounts of `mount_type` that are not declared.
fn orphan_mounts<'a>(
    live: &HashMap<String, MountInfo>,
    mount_type: &str,
    declared: impl Iterator<Item = &'a MountPath>,
    label: &str,
) -> Vec<DeleteTask> {
    let declared: HashSet<&str> = declared.map(MountPath::as_str).collect();

    let mut paths: Vec<&String> = live
        .iter()
        .filter(|(_, info)| info.mount_type == mount_type)
        .map(|(path, _)| path)
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter(|path| {
            let keep = declared.contains(path.as_str());
            if keep {
                debug!("{} exists in configuration, no cleanup necessary", path);
            }
            !keep
        })
        .map(|path| {
            let endpoint = format!("sys/mounts/{}", path.trim_end_matches('/'));
            DeleteTask::new(endpoint.clone(), format!("{} [{}]", label, endpoint))
        })
        .collect()
}

/// Live children listed at `list_path` that are not declared.
///
/// Candidates are addressed as `<item_base>/<name>`.
async fn orphan_children(
    backend: &dyn VaultBackend,
    list_path: &str,
    item_base: &str,
    declared: &HashSet<&str>,
    label: &str,
) -> Result<Vec<DeleteTask>> {
    let live = backend.list(list_path).await?.unwrap_or_default();

    Ok(live
        .iter()
        .map(|name| name.trim_end_matches('/'))
        .filter_map(|name| {
            let path = format!("{}/{}", item_base, name);
            if declared.contains(name) {
                debug!("[{}] exists in configuration, no cleanup necessary", path);
                None
            } else {
                Some(DeleteTask::new(path.clone(), format!("{} [{}]", label, path)))
            }
        })
        .collect())
}
