//! CLI command implementations.

pub mod check;
pub mod rotate;
pub mod sync;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;
use vaultsync_core::AppConfig;
use vaultsync_engine::{ConfigLoader, HookRegistry, Substitutor};
use vaultsync_services::VaultClient;
use vaultsync_types::VaultBackend;

/// Open a client against the configured backend.
pub(crate) fn connect(app: &AppConfig) -> Result<Arc<dyn VaultBackend>> {
    let client = VaultClient::new(app.vault.clone()).context("Failed to create vault client")?;
    debug!("Using vault at {}", client.address());
    Ok(Arc::new(client))
}

/// Loader over the configuration tree, substituting from the backend's secret store.
pub(crate) fn loader(app: &AppConfig, backend: Arc<dyn VaultBackend>, hooks: Arc<HookRegistry>) -> ConfigLoader {
    let substitutor = Substitutor::new(backend, app.sync.vault_secret_base_path.clone());
    ConfigLoader::new(&app.sync.configuration_path, substitutor, hooks)
}
