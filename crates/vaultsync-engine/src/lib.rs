//! Reconciliation engine for vaultsync.
//!
//! Declared state is loaded from a configuration tree, secret placeholders
//! are resolved against the backend's own KV store, and every resource kind
//! is reconciled in three phases: apply (enable, tune and queue writes),
//! barrier (wait for every queued write), and cleanup (re-list live state
//! and review orphans one at a time).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod engines;
pub mod kv;
pub mod loader;
pub mod mounts;
pub mod reconcile;
pub mod review;
pub mod rotation;
pub mod substitution;
pub mod sync;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use auth::{AuthMethod, AuthReconciler, HookRegistry};
pub use engines::{AwsEngine, AwsReconciler, GcpEngine, GcpReconciler, MountOptions};
pub use kv::{KvLocation, KvPathAdapter};
pub use mounts::{DeclaredMount, LiveMounts, MountTable};
pub use loader::{ConfigLoader, DeclaredState, SecretsEngines};
pub use reconcile::Reconciler;
pub use review::{ask_for_confirmation, DeleteReviewer, Prompt, ReviewSummary};
pub use rotation::{rotate_root_credentials, FailedRotation, RotatedMount, RotationReport};
pub use substitution::{SecretSet, Substitutor};
pub use sync::{KindSummary, SyncSummary, Syncer};
pub use tasks::{DeleteTask, WritePool, WriteTask};
