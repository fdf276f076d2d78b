//! The per-kind reconciliation contract.

use crate::mounts::DeclaredMount;
use crate::tasks::{DeleteTask, WritePool};
use async_trait::async_trait;
use vaultsync_types::{ResourceKind, Result, VaultBackend};

/// Converges one resource kind towards its declared state.
///
/// [`mounts`](Reconciler::mounts) is type-checked against live state for
/// every reconciler before any of them applies.
/// [`apply`](Reconciler::apply) enables, tunes and queues writes.
/// [`cleanup`](Reconciler::cleanup) runs only after every queued write has
/// completed and returns the live resources that are no longer declared.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Resource kind handled.
    fn kind(&self) -> ResourceKind;

    /// Number of declared resources.
    fn declared(&self) -> usize;

    /// Mounts [`apply`](Reconciler::apply) will enable or tune.
    fn mounts(&self) -> Vec<DeclaredMount>;

    /// Enable, tune and queue writes for every declared resource.
    async fn apply(&self, backend: &dyn VaultBackend, pool: &WritePool) -> Result<()>;

    /// Re-list live state and return delete candidates.
    async fn cleanup(&self, backend: &dyn VaultBackend) -> Result<Vec<DeleteTask>>;
}
