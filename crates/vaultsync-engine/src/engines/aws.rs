//! AWS secrets engine.

use super::{orphan_children, orphan_mounts, MountOptions};
use crate::mounts::{ensure_mount, DeclaredMount, MountTable};
use crate::reconcile::Reconciler;
use crate::tasks::{DeleteTask, WritePool, WriteTask};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use vaultsync_core::util::struct_to_map;
use vaultsync_types::{MountPath, ResourceKind, Result, VaultBackend};

const MOUNT_TYPE: &str = "aws";

/// Root IAM credentials the engine uses to manage AWS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsRootConfig {
    /// IAM access key id
    pub access_key: String,
    /// IAM secret key
    pub secret_key: String,
    /// Custom IAM endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_endpoint: Option<String>,
    /// Custom STS endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sts_endpoint: Option<String>,
    /// Region for API calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Retry limit for AWS requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,
}

/// Lease settings written to `<mount>config/lease`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfigLease {
    /// Default lease duration
    pub lease: String,
    /// Maximum lease duration
    pub lease_max: String,
}

/// A role; the policy is the content of `roles/<name>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwsRole {
    /// IAM policy document
    pub policy: String,
}

/// On-disk shape of `secrets-engines/<mount>/aws.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsEngineFile {
    /// Mount description and tuning
    #[serde(default)]
    pub mount_options: MountOptions,
    /// Root credentials
    #[serde(default)]
    pub root_config: Option<AwsRootConfig>,
    /// Rewrite root credentials on existing mounts
    #[serde(default)]
    pub overwrite_root_config: bool,
    /// Lease settings
    #[serde(default)]
    pub config_lease: Option<AwsConfigLease>,
}

/// A declared AWS secrets engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AwsEngine {
    /// Mount directory name
    pub name: String,
    /// Mount path
    pub path: MountPath,
    /// Mount description and tuning
    pub mount_options: MountOptions,
    /// Root credentials
    pub root_config: Option<AwsRootConfig>,
    /// Rewrite root credentials even when the mount already existed
    pub overwrite_root_config: bool,
    /// Lease settings
    pub config_lease: Option<AwsConfigLease>,
    /// Roles keyed by name
    pub roles: IndexMap<String, AwsRole>,
}

impl AwsEngine {
    /// Combine a parsed `aws.json` with the roles found next to it.
    pub fn new(name: &str, file: AwsEngineFile, roles: IndexMap<String, AwsRole>) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            path: MountPath::new(name)?,
            mount_options: file.mount_options,
            root_config: file.root_config,
            overwrite_root_config: file.overwrite_root_config,
            config_lease: file.config_lease,
            roles,
        })
    }
}

/// Reconciles AWS mounts and their roles.
pub struct AwsReconciler {
    engines: IndexMap<MountPath, AwsEngine>,
}

impl AwsReconciler {
    /// Create a reconciler for `engines`.
    pub fn new(engines: IndexMap<MountPath, AwsEngine>) -> Self {
        Self { engines }
    }
}

#[async_trait]
impl Reconciler for AwsReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AwsSecretsEngine
    }

    fn declared(&self) -> usize {
        self.engines.len()
    }

    fn mounts(&self) -> Vec<DeclaredMount> {
        self.engines
            .keys()
            .map(|path| DeclaredMount::new(MountTable::Secrets, path.clone(), MOUNT_TYPE))
            .collect()
    }

    async fn apply(&self, backend: &dyn VaultBackend, pool: &WritePool) -> Result<()> {
        let live = MountTable::Secrets.live(backend).await?;

        for engine in self.engines.values() {
            let options = engine.mount_options.enable_options(MOUNT_TYPE);
            let state = ensure_mount(backend, pool, MountTable::Secrets, &live, &engine.path, &options).await?;

            if let Some(root) = &engine.root_config {
                if state.just_enabled() || engine.overwrite_root_config {
                    debug!(
                        "Writing root config for [{}]. JustEnabled={}, OverwriteRootCredentials={}",
                        engine.path,
                        state.just_enabled(),
                        engine.overwrite_root_config
                    );
                    let path = engine.path.join("config/root");
                    pool.submit(WriteTask::new(
                        path.clone(),
                        format!("AWS root config [{}]", path),
                        struct_to_map(root)?,
                    ))
                    .await?;
                } else {
                    debug!("Root config exists for [{}], skipping...", engine.path);
                }
            }

            if let Some(lease) = &engine.config_lease {
                let path = engine.path.join("config/lease");
                pool.submit(WriteTask::new(
                    path.clone(),
                    format!("AWS config lease [{}]", path),
                    struct_to_map(lease)?,
                ))
                .await?;
            }

            for (name, role) in &engine.roles {
                let path = engine.path.join(&format!("roles/{}", name));
                pool.submit(WriteTask::new(path.clone(), format!("AWS role [{}]", path), struct_to_map(role)?))
                    .await?;
            }
        }

        Ok(())
    }

    async fn cleanup(&self, backend: &dyn VaultBackend) -> Result<Vec<DeleteTask>> {
        let live = MountTable::Secrets.live(backend).await?;
        let mut tasks = orphan_mounts(&live, MOUNT_TYPE, self.engines.keys(), "AWS secrets engine");

        for engine in self.engines.values() {
            let declared: HashSet<&str> = engine.roles.keys().map(String::as_str).collect();
            let base = engine.path.join("roles");
            tasks.extend(orphan_children(backend, &base, &base, &declared, "AWS role").await?);
        }

        Ok(tasks)
    }
}
