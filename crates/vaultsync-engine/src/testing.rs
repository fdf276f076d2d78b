//! In-memory backend used by the engine's unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Duration;
use vaultsync_types::{EnableOptions, MountInfo, Result, SecretResponse, SyncError, VaultBackend};

/// A backend call, recorded in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Read(String),
    Write(String),
    List(String),
    Delete(String),
    ListMounts,
    ListAuth,
    EnableMount(String),
    EnableAuth(String),
}

#[derive(Default)]
struct FakeState {
    auth: HashMap<String, MountInfo>,
    mounts: HashMap<String, MountInfo>,
    data: BTreeMap<String, Map<String, Value>>,
    write_responses: HashMap<String, Map<String, Value>>,
    failing_writes: HashSet<String>,
    events: Vec<Event>,
}

/// Stateful fake of the backend facade.
#[derive(Default)]
pub struct FakeVault {
    state: Mutex<FakeState>,
    write_delay: Option<Duration>,
}

fn normalize(path: &str) -> String {
    format!("{}/", path.trim_matches('/'))
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fake data must be an object, got {}", other),
    }
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth(self, path: &str, mount_type: &str) -> Self {
        self.state.lock().auth.insert(normalize(path), MountInfo::new(mount_type));
        self
    }

    pub fn with_mount(self, path: &str, info: MountInfo) -> Self {
        self.state.lock().mounts.insert(normalize(path), info);
        self
    }

    pub fn with_data(self, path: &str, data: Value) -> Self {
        self.state.lock().data.insert(path.to_string(), as_map(data));
        self
    }

    pub fn with_write_response(self, path: &str, data: Value) -> Self {
        self.state.lock().write_responses.insert(path.to_string(), as_map(data));
        self
    }

    pub fn failing_writes_to(self, path: &str) -> Self {
        self.state.lock().failing_writes.insert(path.to_string());
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    pub fn written_paths(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn data_at(&self, path: &str) -> Option<Map<String, Value>> {
        self.state.lock().data.get(path).cloned()
    }

    pub fn has_auth(&self, path: &str) -> bool {
        self.state.lock().auth.contains_key(&normalize(path))
    }

    pub fn has_mount(&self, path: &str) -> bool {
        self.state.lock().mounts.contains_key(&normalize(path))
    }
}

#[async_trait]
impl VaultBackend for FakeVault {
    async fn read(&self, path: &str) -> Result<Option<SecretResponse>> {
        let mut state = self.state.lock();
        state.events.push(Event::Read(path.to_string()));
        Ok(state.data.get(path).map(|data| SecretResponse {
            data: data.clone(),
            warnings: Vec::new(),
        }))
    }

    async fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<SecretResponse>> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.events.push(Event::Write(path.to_string()));
        if state.failing_writes.contains(path) {
            return Err(SyncError::Vault(format!("permission denied on [{}]", path)));
        }
        state.data.insert(path.to_string(), data.clone());
        Ok(state.write_responses.get(path).map(|data| SecretResponse {
            data: data.clone(),
            warnings: Vec::new(),
        }))
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>> {
        let mut state = self.state.lock();
        state.events.push(Event::List(path.to_string()));

        let prefix = normalize(path);
        let keys: BTreeSet<String> = state
            .data
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty())
            .map(|rest| match rest.split_once('/') {
                Some((head, _)) => format!("{}/", head),
                None => rest.to_string(),
            })
            .collect();

        Ok((!keys.is_empty()).then(|| keys.into_iter().collect()))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(Event::Delete(path.to_string()));
        if let Some(rest) = path.strip_prefix("sys/auth/") {
            state.auth.remove(&normalize(rest));
        } else if let Some(rest) = path.strip_prefix("sys/mounts/") {
            state.mounts.remove(&normalize(rest));
        } else {
            state.data.remove(path);
        }
        Ok(())
    }

    async fn list_mounts(&self) -> Result<HashMap<String, MountInfo>> {
        let mut state = self.state.lock();
        state.events.push(Event::ListMounts);
        Ok(state.mounts.clone())
    }

    async fn list_auth(&self) -> Result<HashMap<String, MountInfo>> {
        let mut state = self.state.lock();
        state.events.push(Event::ListAuth);
        Ok(state.auth.clone())
    }

    async fn enable_mount(&self, path: &str, options: &EnableOptions) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(Event::EnableMount(path.to_string()));
        state.mounts.insert(
            normalize(path),
            MountInfo {
                mount_type: options.mount_type.clone(),
                description: options.description.clone(),
                options: options.options.clone(),
            },
        );
        Ok(())
    }

    async fn enable_auth(&self, path: &str, options: &EnableOptions) -> Result<()> {
        let mut state = self.state.lock();
        state.events.push(Event::EnableAuth(path.to_string()));
        state.auth.insert(normalize(path), MountInfo::new(options.mount_type.clone()));
        Ok(())
    }
}
