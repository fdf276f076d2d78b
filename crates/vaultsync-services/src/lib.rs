//! # vaultsync Services
//!
//! Backend client implementations for vaultsync.
//!
//! This crate provides an async HTTP client for HashiCorp Vault (and API
//! compatible servers) implementing the `VaultBackend` facade.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod vault;

pub use vault::VaultClient;
