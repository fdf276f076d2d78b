//! # vaultsync Types
//!
//! Core types, traits, and enums shared across all vaultsync crates.
//!
//! This crate provides the fundamental building blocks for the reconciler:
//!
//! - Normalized mount paths
//! - Enums for log levels, KV protocol versions and resource kinds
//! - Wire types for mounts and secrets
//! - The `VaultBackend` facade trait
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use vaultsync_types::{KvVersion, MountPath};
//!
//! let mount = MountPath::new("secret").unwrap();
//! assert_eq!(mount.join("team/db"), "secret/team/db");
//! assert_eq!(KvVersion::from_options(None), KvVersion::V1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod mount;
pub mod traits;
pub mod config;

// Re-export common types for convenience
pub use errors::{SyncError, Result};
pub use identifiers::MountPath;
pub use enums::{LogLevel, LogFormat, KvVersion, ResourceKind};
pub use mount::{EnableOptions, MountInfo, SecretResponse, TuneConfig};
pub use traits::VaultBackend;
pub use config::{LogConfig, SyncSettings, VaultSettings};
