//! # vaultsync Core
//!
//! Core utilities, configuration management and logging for the
//! vaultsync reconciler.
//!
//! This crate provides:
//!
//! - **Configuration**: Multi-layer configuration (defaults, file, flags, environment)
//! - **Logging**: Structured logging with selectable format and optional log file
//! - **File Operations**: Configuration tree enumeration and format detection
//! - **Data Structures**: Deep merging, struct to write-body conversion

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod log;
pub mod util;

// Re-export commonly used items
pub use config::{AppConfig, Config};
pub use vaultsync_types::{SyncError, Result};

/// vaultsync application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// vaultsync application name
pub const APP_NAME: &str = "vaultsync";
