//! Mount enable/tune decisions shared by every resource kind.

use crate::tasks::{WritePool, WriteTask};
use std::collections::HashMap;
use tracing::{debug, info};
use vaultsync_types::{EnableOptions, MountInfo, MountPath, Result, SyncError, VaultBackend};

/// Which mount table a resource lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountTable {
    /// `sys/auth`
    Auth,
    /// `sys/mounts`
    Secrets,
}

impl MountTable {
    /// Snapshot the live table.
    pub async fn live(&self, backend: &dyn VaultBackend) -> Result<HashMap<String, MountInfo>> {
        match self {
            MountTable::Auth => backend.list_auth().await,
            MountTable::Secrets => backend.list_mounts().await,
        }
    }

    /// Enable a mount in this table.
    pub async fn enable(&self, backend: &dyn VaultBackend, path: &MountPath, options: &EnableOptions) -> Result<()> {
        match self {
            MountTable::Auth => backend.enable_auth(path.as_str(), options).await,
            MountTable::Secrets => backend.enable_mount(path.as_str(), options).await,
        }
    }

    /// Tuning endpoint for `path`.
    pub fn tune_path(&self, path: &MountPath) -> String {
        format!("{}/tune", self.mount_endpoint(path))
    }

    /// Endpoint that enables or disables `path`.
    pub fn mount_endpoint(&self, path: &MountPath) -> String {
        match self {
            MountTable::Auth => format!("sys/auth/{}", path.trimmed()),
            MountTable::Secrets => format!("sys/mounts/{}", path.trimmed()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MountTable::Auth => "Auth mount",
            MountTable::Secrets => "Secrets engine",
        }
    }
}

/// A mount some reconciler intends to enable or tune.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMount {
    /// Table the mount lives in
    pub table: MountTable,
    /// Mount path
    pub path: MountPath,
    /// Declared mount type
    pub mount_type: String,
}

impl DeclaredMount {
    /// Declared mount of `mount_type` at `path`.
    pub fn new(table: MountTable, path: MountPath, mount_type: impl Into<String>) -> Self {
        Self {
            table,
            path,
            mount_type: mount_type.into(),
        }
    }
}

/// Both live mount tables, read once.
#[derive(Debug, Clone, Default)]
pub struct LiveMounts {
    auth: HashMap<String, MountInfo>,
    secrets: HashMap<String, MountInfo>,
}

impl LiveMounts {
    /// Read `sys/auth` and `sys/mounts`.
    pub async fn snapshot(backend: &dyn VaultBackend) -> Result<Self> {
        Ok(Self {
            auth: MountTable::Auth.live(backend).await?,
            secrets: MountTable::Secrets.live(backend).await?,
        })
    }

    /// Fail if `mount` exists live with another type.
    pub fn check(&self, mount: &DeclaredMount) -> Result<()> {
        let live = match mount.table {
            MountTable::Auth => &self.auth,
            MountTable::Secrets => &self.secrets,
        };
        check_type(live, &mount.path, &mount.mount_type)
    }
}

fn check_type(live: &HashMap<String, MountInfo>, path: &MountPath, declared: &str) -> Result<()> {
    match live.get(path.as_str()) {
        Some(existing) if existing.mount_type != declared => Err(SyncError::TypeMismatch {
            path: path.to_string(),
            live: existing.mount_type.clone(),
            declared: declared.to_string(),
        }),
        _ => Ok(()),
    }
}

/// What [`ensure_mount`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Enabled by this run
    JustEnabled,
    /// Already present with the declared type
    Existing,
}

impl MountState {
    /// Whether this run performed the enable.
    pub fn just_enabled(&self) -> bool {
        matches!(self, MountState::JustEnabled)
    }
}

/// Bring a declared mount into existence.
///
/// An absent mount is enabled synchronously. A present mount with the
/// declared type gets a tune write queued. A present mount of another type
/// is fatal.
pub async fn ensure_mount(
    backend: &dyn VaultBackend,
    pool: &WritePool,
    table: MountTable,
    live: &HashMap<String, MountInfo>,
    path: &MountPath,
    options: &EnableOptions,
) -> Result<MountState> {
    check_type(live, path, &options.mount_type)?;

    match live.get(path.as_str()) {
        Some(_) => {
            let tune_path = table.tune_path(path);
            debug!("{} [{}] exists, queueing tune", table.label(), path);
            pool.submit(WriteTask::new(
                tune_path.clone(),
                format!("{} tune for [{}]", table.label(), tune_path),
                options.tune_body(),
            ))
            .await?;
            Ok(MountState::Existing)
        }
        None => {
            debug!("{} [{}] is not enabled, enabling", table.label(), path);
            table.enable(backend, path, options).await.map_err(|e| {
                SyncError::Vault(format!("Error enabling mount [{}] ({}): {}", path, options.mount_type, e))
            })?;
            info!("{} enabled: {} {}", table.label(), path, options.mount_type);
            Ok(MountState::JustEnabled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, FakeVault};
    use std::sync::Arc;

    fn options(mount_type: &str) -> EnableOptions {
        EnableOptions {
            mount_type: mount_type.to_string(),
            description: "d".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoints() {
        let path = MountPath::new("ldap").unwrap();
        assert_eq!(MountTable::Auth.tune_path(&path), "sys/auth/ldap/tune");
        assert_eq!(MountTable::Secrets.tune_path(&path), "sys/mounts/ldap/tune");
        assert_eq!(MountTable::Auth.mount_endpoint(&path), "sys/auth/ldap");
    }

    #[tokio::test]
    async fn test_absent_mount_is_enabled() {
        let fake = Arc::new(FakeVault::new());
        let pool = WritePool::spawn(fake.clone(), 1);
        let path = MountPath::new("aws-prod").unwrap();

        let live = MountTable::Secrets.live(fake.as_ref()).await.unwrap();
        let state = ensure_mount(fake.as_ref(), &pool, MountTable::Secrets, &live, &path, &options("aws"))
            .await
            .unwrap();
        pool.wait().await.unwrap();

        assert_eq!(state, MountState::JustEnabled);
        assert!(fake.events().contains(&Event::EnableMount("aws-prod/".to_string())));
        assert!(fake.written_paths().is_empty());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_existing_mount_is_tuned() {
        let fake = Arc::new(FakeVault::new().with_auth("ldap", "ldap"));
        let pool = WritePool::spawn(fake.clone(), 1);
        let path = MountPath::new("ldap").unwrap();

        let live = MountTable::Auth.live(fake.as_ref()).await.unwrap();
        let state = ensure_mount(fake.as_ref(), &pool, MountTable::Auth, &live, &path, &options("ldap"))
            .await
            .unwrap();
        pool.wait().await.unwrap();

        assert_eq!(state, MountState::Existing);
        assert_eq!(fake.written_paths(), vec!["sys/auth/ldap/tune"]);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_type_mismatch_is_fatal() {
        let fake = Arc::new(FakeVault::new().with_auth("github", "github"));
        let pool = WritePool::spawn(fake.clone(), 1);
        let path = MountPath::new("github").unwrap();

        let live = MountTable::Auth.live(fake.as_ref()).await.unwrap();
        let err = ensure_mount(fake.as_ref(), &pool, MountTable::Auth, &live, &path, &options("ldap"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::TypeMismatch { ref live, .. } if live == "github"));
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_live_mounts_check_uses_matching_table() {
        let fake = FakeVault::new()
            .with_auth("gcp", "userpass")
            .with_mount("gcp", MountInfo::new("gcp"));
        let live = LiveMounts::snapshot(&fake).await.unwrap();
        let path = MountPath::new("gcp").unwrap();

        live.check(&DeclaredMount::new(MountTable::Secrets, path.clone(), "gcp"))
            .unwrap();
        live.check(&DeclaredMount::new(MountTable::Secrets, MountPath::new("new").unwrap(), "aws"))
            .unwrap();
        let err = live
            .check(&DeclaredMount::new(MountTable::Auth, path, "ldap"))
            .unwrap_err();

        assert!(matches!(err, SyncError::TypeMismatch { ref live, ref declared, .. } if live == "userpass" && declared == "ldap"));
        assert!(fake.written_paths().is_empty());
    }
}
