//! Post-configuration hooks for auth methods that manage child resources.
//!
//! Hooks are looked up by mount type. Each hook owns one or more named
//! collections under `additional_config` (for example `users` on a
//! `userpass` mount). A collection is only managed when its key is present,
//! so an auth method that omits `groups` never has its groups pruned.

use super::AuthMethod;
use crate::tasks::DeleteTask;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vaultsync_types::{Result, SyncError, VaultBackend};

/// Additional setup run after an auth method's mount and config.
#[async_trait]
pub trait AuthHook: Send + Sync {
    /// Hook name used in logs.
    fn name(&self) -> &'static str;

    /// Check declared entries before anything is written.
    fn validate(&self, _method: &AuthMethod) -> Result<()> {
        Ok(())
    }

    /// Write every declared entry.
    async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()>;

    /// Live entries that are no longer declared.
    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>>;
}

/// A managed child collection: config key, path segment, and label.
#[derive(Debug, Clone, Copy)]
struct Collection {
    key: &'static str,
    segment: &'static str,
    label: &'static str,
}

const USERS: Collection = Collection {
    key: "users",
    segment: "users",
    label: "User",
};

const GROUPS: Collection = Collection {
    key: "groups",
    segment: "groups",
    label: "Group",
};

const ROLES: Collection = Collection {
    key: "roles",
    segment: "role",
    label: "Role",
};

impl Collection {
    fn entries(&self, method: &AuthMethod) -> Result<Option<Map<String, Value>>> {
        let Some(value) = method
            .additional_config
            .as_ref()
            .and_then(|config| config.get(self.key))
        else {
            return Ok(None);
        };

        let Value::Object(entries) = value else {
            return Err(SyncError::Validation(format!(
                "Auth method [{}]: additional_config.{} must be an object keyed by name",
                method.path, self.key
            )));
        };

        for (name, entry) in entries {
            if !entry.is_object() {
                return Err(SyncError::Validation(format!(
                    "Auth method [{}]: {} '{}' must be an object",
                    method.path, self.key, name
                )));
            }
        }

        Ok(Some(entries.clone()))
    }

    fn base(&self, method: &AuthMethod) -> String {
        format!("auth/{}", method.path.join(self.segment))
    }

    async fn write_all(
        &self,
        backend: &dyn VaultBackend,
        method: &AuthMethod,
        prepare: impl Fn(&str, Map<String, Value>) -> Map<String, Value> + Send + Sync,
    ) -> Result<()> {
        let Some(entries) = self.entries(method)? else {
            return Ok(());
        };

        let base = self.base(method);
        for (name, entry) in entries {
            let Value::Object(body) = entry else {
                continue;
            };
            let path = format!("{}/{}", base, name);
            backend
                .write(&path, &prepare(&name, body))
                .await
                .map_err(|e| SyncError::Vault(format!("Failed to write {} [{}]: {}", self.label, path, e)))?;
            debug!("{} [{}] written", self.label, path);
        }
        Ok(())
    }

    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        let Some(entries) = self.entries(method)? else {
            return Ok(Vec::new());
        };

        let base = self.base(method);
        let live = backend.list(&base).await?.unwrap_or_default();

        Ok(live
            .iter()
            .map(|key| key.trim_end_matches('/'))
            .filter(|key| !entries.contains_key(*key))
            .map(|key| {
                let path = format!("{}/{}", base, key);
                DeleteTask::new(path.clone(), format!("{} [{}]", self.label, path))
            })
            .collect())
    }
}

fn unchanged(_: &str, body: Map<String, Value>) -> Map<String, Value> {
    body
}

/// `userpass`: manages `users`.
pub struct UserpassHook;

#[async_trait]
impl AuthHook for UserpassHook {
    fn name(&self) -> &'static str {
        "userpass"
    }

    async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()> {
        USERS.write_all(backend, method, unchanged).await
    }

    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        USERS.orphans(backend, method).await
    }
}

/// `ldap`: manages `groups` and `users`.
pub struct LdapHook;

#[async_trait]
impl AuthHook for LdapHook {
    fn name(&self) -> &'static str {
        "ldap"
    }

    async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()> {
        GROUPS.write_all(backend, method, unchanged).await?;
        USERS.write_all(backend, method, unchanged).await
    }

    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        let mut tasks = GROUPS.orphans(backend, method).await?;
        tasks.extend(USERS.orphans(backend, method).await?);
        Ok(tasks)
    }
}

/// `jwt` and `oidc`: manages `roles`, defaulting `role_type` to the mount type.
pub struct JwtHook;

#[async_trait]
impl AuthHook for JwtHook {
    fn name(&self) -> &'static str {
        "jwt"
    }

    async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()> {
        let mount_type = method.options.mount_type.clone();
        ROLES
            .write_all(backend, method, move |_, mut body| {
                body.entry("role_type")
                    .or_insert_with(|| Value::String(mount_type.clone()));
                body
            })
            .await
    }

    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        ROLES.orphans(backend, method).await
    }
}

/// `kubernetes`: manages `roles` bound to service accounts.
pub struct KubernetesHook;

const KUBERNETES_REQUIRED: [&str; 2] = ["bound_service_account_names", "bound_service_account_namespaces"];

#[async_trait]
impl AuthHook for KubernetesHook {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn validate(&self, method: &AuthMethod) -> Result<()> {
        let Some(roles) = ROLES.entries(method)? else {
            return Ok(());
        };

        for (name, role) in &roles {
            for field in KUBERNETES_REQUIRED {
                if role.get(field).is_none() {
                    return Err(SyncError::Validation(format!(
                        "Kubernetes role '{}' on [{}] is missing {}",
                        name, method.path, field
                    )));
                }
            }
        }
        Ok(())
    }

    async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()> {
        self.validate(method)?;
        ROLES.write_all(backend, method, unchanged).await
    }

    async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        ROLES.orphans(backend, method).await
    }
}

/// Hooks keyed by auth mount type.
#[derive(Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn AuthHook>>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        let jwt: Arc<dyn AuthHook> = Arc::new(JwtHook);
        let mut registry = Self::empty();
        registry.register("userpass", Arc::new(UserpassHook));
        registry.register("ldap", Arc::new(LdapHook));
        registry.register("jwt", jwt.clone());
        registry.register("oidc", jwt);
        registry.register("kubernetes", Arc::new(KubernetesHook));
        registry
    }
}

impl HookRegistry {
    /// A registry with no hooks.
    pub fn empty() -> Self {
        Self { hooks: HashMap::new() }
    }

    /// Register `hook` for `mount_type`, replacing any previous one.
    pub fn register(&mut self, mount_type: impl Into<String>, hook: Arc<dyn AuthHook>) {
        self.hooks.insert(mount_type.into(), hook);
    }

    /// Hook registered for `mount_type`.
    pub fn get(&self, mount_type: &str) -> Option<&Arc<dyn AuthHook>> {
        self.hooks.get(mount_type)
    }

    /// Validate `method` against its hook, if any.
    pub fn validate(&self, method: &AuthMethod) -> Result<()> {
        match self.get(&method.options.mount_type) {
            Some(hook) => hook.validate(method),
            None => Ok(()),
        }
    }

    /// Run the hook for `method`. Unknown types are skipped with a warning.
    pub async fn apply(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<()> {
        match self.get(&method.options.mount_type) {
            Some(hook) => {
                info!("Running additional configuration for [auth/{}] ({})", method.path, hook.name());
                hook.apply(backend, method).await
            }
            None => {
                warn!(
                    r#"Auth type "{}" not currently supported, please open PR!"#,
                    method.options.mount_type
                );
                Ok(())
            }
        }
    }

    /// Delete candidates from the hook for `method`.
    pub async fn orphans(&self, backend: &dyn VaultBackend, method: &AuthMethod) -> Result<Vec<DeleteTask>> {
        match self.get(&method.options.mount_type) {
            Some(hook) => hook.orphans(backend, method).await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, FakeVault};
    use serde_json::json;
    use vaultsync_types::{EnableOptions, MountPath};

    fn method(mount_type: &str, additional: Value) -> AuthMethod {
        AuthMethod {
            name: mount_type.to_string(),
            path: MountPath::new(mount_type).unwrap(),
            options: EnableOptions {
                mount_type: mount_type.to_string(),
                ..Default::default()
            },
            config: None,
            additional_config: Some(additional),
        }
    }

    #[tokio::test]
    async fn test_userpass_writes_users() {
        let fake = FakeVault::new();
        let m = method("userpass", json!({"users": {"alice": {"password": "x", "policies": "dev"}}}));

        HookRegistry::default().apply(&fake, &m).await.unwrap();

        assert_eq!(fake.written_paths(), vec!["auth/userpass/users/alice"]);
        assert_eq!(fake.data_at("auth/userpass/users/alice").unwrap()["policies"], "dev");
    }

    #[tokio::test]
    async fn test_oidc_role_type_defaults_to_mount_type() {
        let fake = FakeVault::new();
        let m = method(
            "oidc",
            json!({"roles": {"default": {"user_claim": "sub"}, "ci": {"role_type": "jwt"}}}),
        );

        HookRegistry::default().apply(&fake, &m).await.unwrap();

        assert_eq!(fake.data_at("auth/oidc/role/default").unwrap()["role_type"], "oidc");
        assert_eq!(fake.data_at("auth/oidc/role/ci").unwrap()["role_type"], "jwt");
    }

    #[tokio::test]
    async fn test_kubernetes_requires_bindings() {
        let fake = FakeVault::new();
        let m = method("kubernetes", json!({"roles": {"app": {"bound_service_account_names": ["app"]}}}));

        let err = HookRegistry::default().apply(&fake, &m).await.unwrap_err();
        assert!(err.to_string().contains("bound_service_account_namespaces"));
        assert!(fake.events().is_empty());
    }

    #[tokio::test]
    async fn test_ldap_orphans_only_for_declared_collections() {
        let fake = FakeVault::new()
            .with_data("auth/ldap/groups/admins", json!({}))
            .with_data("auth/ldap/groups/old", json!({}))
            .with_data("auth/ldap/users/bob", json!({}));
        let m = method("ldap", json!({"groups": {"admins": {"policies": "root"}}}));

        let tasks = HookRegistry::default().orphans(&fake, &m).await.unwrap();

        assert_eq!(tasks, vec![DeleteTask::new("auth/ldap/groups/old", "Group [auth/ldap/groups/old]")]);
        assert!(!fake.events().contains(&Event::List("auth/ldap/users".to_string())));
    }

    #[tokio::test]
    async fn test_unknown_type_is_skipped() {
        let fake = FakeVault::new();
        let m = method("github", json!({"users": {"x": {}}}));

        HookRegistry::default().apply(&fake, &m).await.unwrap();
        assert!(HookRegistry::default().orphans(&fake, &m).await.unwrap().is_empty());
        assert!(fake.events().is_empty());
    }

    #[test]
    fn test_collection_must_be_object() {
        let m = method("userpass", json!({"users": ["alice"]}));
        assert!(USERS.entries(&m).is_err());
    }
}
