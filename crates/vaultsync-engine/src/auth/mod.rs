//! Auth method declarations and their reconciler.

mod hooks;

pub use hooks::{AuthHook, HookRegistry, JwtHook, KubernetesHook, LdapHook, UserpassHook};

use crate::mounts::{ensure_mount, DeclaredMount, MountTable};
use crate::reconcile::Reconciler;
use crate::tasks::{DeleteTask, WritePool, WriteTask};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use vaultsync_types::{EnableOptions, MountPath, ResourceKind, Result, VaultBackend};

/// Backend default auth mount, never pruned.
const DEFAULT_TOKEN_MOUNT: &str = "token/";

/// On-disk shape of `auth_methods/<name>.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthMethodFile {
    /// Mount type, description and tuning
    pub auth_options: EnableOptions,
    /// Body written to `auth/<path>config`
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
    /// Input for the type specific hook
    #[serde(default)]
    pub additional_config: Option<Value>,
}

/// A declared auth method.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthMethod {
    /// Logical name (file stem)
    pub name: String,
    /// Mount path, `<name>/`
    pub path: MountPath,
    /// Enable options
    pub options: EnableOptions,
    /// Config written after enable/tune
    pub config: Option<Map<String, Value>>,
    /// Hook input
    pub additional_config: Option<Value>,
}

impl AuthMethod {
    /// Build a declaration from a parsed file.
    pub fn from_file(name: &str, file: AuthMethodFile) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            path: MountPath::new(name)?,
            options: file.auth_options,
            config: file.config,
            additional_config: file.additional_config,
        })
    }
}

/// Reconciles the `sys/auth` table.
pub struct AuthReconciler {
    methods: IndexMap<MountPath, AuthMethod>,
    hooks: Arc<HookRegistry>,
}

impl AuthReconciler {
    /// Create a reconciler for `methods`.
    pub fn new(methods: IndexMap<MountPath, AuthMethod>, hooks: Arc<HookRegistry>) -> Self {
        Self { methods, hooks }
    }

    /// Declared methods, in load order.
    pub fn methods(&self) -> impl Iterator<Item = &AuthMethod> {
        self.methods.values()
    }
}

#[async_trait]
impl Reconciler for AuthReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AuthMethod
    }

    fn declared(&self) -> usize {
        self.methods.len()
    }

    fn mounts(&self) -> Vec<DeclaredMount> {
        self.methods
            .values()
            .map(|m| DeclaredMount::new(MountTable::Auth, m.path.clone(), m.options.mount_type.clone()))
            .collect()
    }

    async fn apply(&self, backend: &dyn VaultBackend, pool: &WritePool) -> Result<()> {
        let live = MountTable::Auth.live(backend).await?;

        for method in self.methods.values() {
            ensure_mount(backend, pool, MountTable::Auth, &live, &method.path, &method.options).await?;

            if let Some(config) = &method.config {
                let config_path = format!("auth/{}", method.path.join("config"));
                pool.submit(WriteTask::new(
                    config_path.clone(),
                    format!("Auth mount config for [{}]", config_path),
                    config.clone(),
                ))
                .await?;
            }

            self.hooks.apply(backend, method).await?;
        }

        Ok(())
    }

    async fn cleanup(&self, backend: &dyn VaultBackend) -> Result<Vec<DeleteTask>> {
        let live = MountTable::Auth.live(backend).await?;

        let mut paths: Vec<_> = live.iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));

        let mut tasks = Vec::new();
        for (path, info) in paths {
            if path == DEFAULT_TOKEN_MOUNT && info.mount_type == "token" {
                continue;
            }

            let declared = MountPath::new(path).map_or(false, |p| self.methods.contains_key(&p));
            if declared {
                debug!("{} exists in configuration, no cleanup necessary", path);
                continue;
            }

            let endpoint = format!("sys/auth/{}", path.trim_end_matches('/'));
            info!("Auth method [{}] is not declared", path);
            tasks.push(DeleteTask::new(endpoint.clone(), format!("Auth method [{}]", endpoint)));
        }

        for method in self.methods.values() {
            tasks.extend(self.hooks.orphans(backend, method).await?);
        }

        Ok(tasks)
    }
}
