//! Vault service client implementation.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;
use url::Url;
use vaultsync_types::{
    EnableOptions, MountInfo, Result, SecretResponse, SyncError, VaultBackend, VaultSettings,
};

/// Vault client for interacting with HashiCorp Vault.
#[derive(Clone)]
pub struct VaultClient {
    settings: VaultSettings,
    token: String,
    client: Client,
    base_url: Url,
}

impl VaultClient {
    /// Create a new Vault client.
    pub fn new(settings: VaultSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.address)
            .map_err(|e| SyncError::Vault(format!("Invalid vault URL: {}", e)))?;

        let token = settings
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Vault("No vault token available (set VAULT_TOKEN)".to_string()))?;

        let mut builder = Client::builder();

        if settings.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| SyncError::Vault(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            token,
            client,
            base_url,
        })
    }

    /// Address this client talks to.
    pub fn address(&self) -> &str {
        &self.settings.address
    }

    /// Build the API URL for a backend path.
    fn api_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/v1/{}", path.trim_start_matches('/')))
            .map_err(|e| SyncError::Vault(format!("Invalid path [{}]: {}", path, e)))
    }

    /// Make a request to Vault.
    ///
    /// Returns `None` on 404 and `Some(Value::Null)` for an empty body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.api_url(path)?;
        debug!("{} {}", method, url.path());

        let mut req = self.client.request(method, url).header("X-Vault-Token", &self.token);

        if let Some(ns) = &self.settings.namespace {
            req = req.header("X-Vault-Namespace", ns);
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Vault(format!("Request failed on [{}]: {}", path, e)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::Vault(format!("Failed to read response from [{}]: {}", path, e)))?;

        if !status.is_success() {
            return Err(SyncError::Vault(format!(
                "Vault request failed on [{}] ({}): {}",
                path, status, text
            )));
        }

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| SyncError::Vault(format!("Failed to parse response from [{}]: {}", path, e)))
    }

    async fn enable(&self, table: &str, path: &str, options: &EnableOptions) -> Result<()> {
        let body = serde_json::to_value(options)?;
        let endpoint = format!("{}/{}", table, path.trim_end_matches('/'));

        match self.request(Method::POST, &endpoint, Some(&body)).await? {
            Some(_) => Ok(()),
            None => Err(SyncError::Vault(format!("Endpoint [{}] not found", endpoint))),
        }
    }

    async fn mount_table(&self, table: &str) -> Result<HashMap<String, MountInfo>> {
        let value = self
            .request(Method::GET, table, None)
            .await?
            .ok_or_else(|| SyncError::Vault(format!("Endpoint [{}] not found", table)))?;
        parse_mount_table(&value)
    }
}

/// Parse a `sys/mounts` or `sys/auth` response.
///
/// Newer servers wrap the table in `data`; older ones also repeat it at
/// the top level next to request metadata.
fn parse_mount_table(value: &Value) -> Result<HashMap<String, MountInfo>> {
    let table = value
        .get("data")
        .filter(|d| d.is_object())
        .unwrap_or(value)
        .as_object()
        .ok_or_else(|| SyncError::Vault("Mount table is not an object".to_string()))?;

    let mut mounts = HashMap::new();
    for (path, entry) in table {
        if entry.get("type").map_or(true, |t| !t.is_string()) {
            continue;
        }
        let info: MountInfo = serde_json::from_value(entry.clone())?;
        let path = format!("{}/", path.trim_end_matches('/'));
        mounts.insert(path, info);
    }

    Ok(mounts)
}

fn parse_secret(value: Value, path: &str) -> Result<SecretResponse> {
    if value.is_null() {
        return Ok(SecretResponse::default());
    }
    serde_json::from_value(value)
        .map_err(|e| SyncError::Vault(format!("Unexpected secret shape at [{}]: {}", path, e)))
}

#[async_trait]
impl VaultBackend for VaultClient {
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>> {
        match self.request(Method::GET, path, None).await? {
            Some(value) => parse_secret(value, path).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<SecretResponse>> {
        let body = Value::Object(data.clone());

        match self.request(Method::POST, path, Some(&body)).await? {
            Some(Value::Null) => Ok(None),
            Some(value) => parse_secret(value, path).map(Some),
            None => Err(SyncError::Vault(format!("Write to [{}] failed: path not found", path))),
        }
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>> {
        let endpoint = format!("{}?list=true", path.trim_end_matches('/'));

        let Some(value) = self.request(Method::GET, &endpoint, None).await? else {
            return Ok(None);
        };

        let keys = value
            .pointer("/data/keys")
            .and_then(|k| k.as_array())
            .ok_or_else(|| SyncError::Vault(format!("Secret list failed on [{}], no keys present", path)))?;

        keys.iter()
            .map(|k| {
                k.as_str().map(str::to_string).ok_or_else(|| {
                    SyncError::Vault(format!("Issue parsing Vault secret list [{}]: non-string key", path))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>> {
        self.mount_table("sys/mounts").await
    }

    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>> {
        self.mount_table("sys/auth").await
    }

    async fn enable_mount(&self, path: &str, options: &EnableOptions) -> Result<()> {
        self.enable("sys/mounts", path, options).await
    }

    async fn enable_auth(&self, path: &str, options: &EnableOptions) -> Result<()> {
        self.enable("sys/auth", path, options).await
    }
}
