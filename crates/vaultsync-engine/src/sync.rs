//! Run coordination: apply, barrier, cleanup, review.

use crate::mounts::LiveMounts;
use crate::reconcile::Reconciler;
use crate::review::{DeleteReviewer, Prompt};
use crate::tasks::WritePool;
use std::sync::Arc;
use tracing::{debug, info};
use vaultsync_types::{ResourceKind, Result, SyncSettings, VaultBackend};

/// Outcome for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSummary {
    /// Resource kind
    pub kind: ResourceKind,
    /// Declared resources
    pub declared: usize,
    /// Writes executed by the pool
    pub writes: usize,
    /// Paths deleted after confirmation
    pub deleted: Vec<String>,
    /// Orphans the operator chose to keep
    pub kept: Vec<String>,
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Per kind, in run order
    pub kinds: Vec<KindSummary>,
}

impl SyncSummary {
    /// Total writes executed.
    pub fn writes(&self) -> usize {
        self.kinds.iter().map(|k| k.writes).sum()
    }

    /// Total deletes executed.
    pub fn deleted(&self) -> usize {
        self.kinds.iter().map(|k| k.deleted.len()).sum()
    }
}

/// Drives reconcilers through their phases against one backend.
pub struct Syncer {
    backend: Arc<dyn VaultBackend>,
    pool: WritePool,
    reviewer: DeleteReviewer,
}

impl Syncer {
    /// Start a syncer with a write pool sized from `settings`.
    pub fn new(backend: Arc<dyn VaultBackend>, settings: &SyncSettings, prompt: Box<dyn Prompt>) -> Self {
        let pool = WritePool::spawn(backend.clone(), settings.workers);
        let reviewer = DeleteReviewer::new(backend.clone(), prompt, settings.confirm_attempts);
        Self {
            backend,
            pool,
            reviewer,
        }
    }

    /// Reconcile one resource kind.
    ///
    /// Cleanup only starts after every write queued by apply has completed.
    pub async fn reconcile(&mut self, reconciler: &dyn Reconciler) -> Result<KindSummary> {
        let kind = reconciler.kind();
        info!("Syncing {}s ({} declared)", kind, reconciler.declared());

        let before = self.pool.submitted();
        reconciler.apply(self.backend.as_ref(), &self.pool).await?;
        self.pool.wait().await?;
        let writes = self.pool.submitted() - before;

        let candidates = reconciler.cleanup(self.backend.as_ref()).await?;
        let review = self.reviewer.review(candidates).await?;

        Ok(KindSummary {
            kind,
            declared: reconciler.declared(),
            writes,
            deleted: review.deleted,
            kept: review.kept,
        })
    }

    /// Check every declared mount against live state.
    ///
    /// Runs before any reconciler applies, so a type mismatch anywhere
    /// aborts the run with nothing changed.
    pub async fn preflight(&self, reconcilers: &[Box<dyn Reconciler>]) -> Result<()> {
        if reconcilers.iter().all(|r| r.declared() == 0) {
            return Ok(());
        }

        let live = LiveMounts::snapshot(self.backend.as_ref()).await?;
        for reconciler in reconcilers {
            for mount in reconciler.mounts() {
                live.check(&mount)?;
            }
        }

        debug!("Declared mount types match live state");
        Ok(())
    }

    /// Reconcile every kind in order, then stop the pool.
    pub async fn run(mut self, reconcilers: Vec<Box<dyn Reconciler>>) -> Result<SyncSummary> {
        let mut summary = SyncSummary::default();

        if let Err(e) = self.preflight(&reconcilers).await {
            self.pool.shutdown().await;
            return Err(e);
        }

        let mut outcome = Ok(());
        for reconciler in &reconcilers {
            match self.reconcile(reconciler.as_ref()).await {
                Ok(kind) => summary.kinds.push(kind),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        self.pool.shutdown().await;
        outcome.map(|_| summary)
    }
}
