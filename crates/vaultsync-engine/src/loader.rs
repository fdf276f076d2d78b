//! Loading declared state from the configuration tree.
//!
//! ```text
//! <root>/
//!   auth_methods/<name>.json
//!   secrets-engines/<mount>/aws.json
//!   secrets-engines/<mount>/roles/<role>.json
//!   secrets-engines/<mount>/gcp.json
//!   secrets-engines/<mount>/rolesets/<roleset>.json
//! ```
//!
//! Every file is validated, substituted and then parsed. Any failure is
//! fatal for the whole load so that reconciliation never runs against a
//! partial view of the configuration.

use crate::auth::{AuthMethod, AuthMethodFile, AuthReconciler, HookRegistry};
use crate::engines::{AwsEngine, AwsEngineFile, AwsReconciler, AwsRole, GcpEngine, GcpEngineFile, GcpReconciler, GcpRoleSet};
use crate::reconcile::Reconciler;
use crate::substitution::Substitutor;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vaultsync_core::util::{list_subdirs, read_config_dir, ConfigFile};
use vaultsync_types::{bail, MountPath, Result, SyncError};

const AUTH_DIR: &str = "auth_methods";
const ENGINES_DIR: &str = "secrets-engines";

/// Everything declared in the configuration tree.
///
/// A kind that was not loaded is `None` and is left alone entirely,
/// including cleanup.
#[derive(Debug, Default)]
pub struct DeclaredState {
    /// Auth methods keyed by mount path
    pub auth_methods: Option<IndexMap<MountPath, AuthMethod>>,
    /// AWS engines keyed by mount path
    pub aws_engines: Option<IndexMap<MountPath, AwsEngine>>,
    /// GCP engines keyed by mount path
    pub gcp_engines: Option<IndexMap<MountPath, GcpEngine>>,
}

impl DeclaredState {
    /// Reconcilers in run order: auth methods, AWS, GCP.
    pub fn into_reconcilers(self, hooks: Arc<HookRegistry>) -> Vec<Box<dyn Reconciler>> {
        let mut reconcilers: Vec<Box<dyn Reconciler>> = Vec::new();
        if let Some(methods) = self.auth_methods {
            reconcilers.push(Box::new(AuthReconciler::new(methods, hooks)));
        }
        if let Some(engines) = self.aws_engines {
            reconcilers.push(Box::new(AwsReconciler::new(engines)));
        }
        if let Some(engines) = self.gcp_engines {
            reconcilers.push(Box::new(GcpReconciler::new(engines)));
        }
        reconcilers
    }
}

/// Secrets engines found under `secrets-engines/`.
#[derive(Debug, Default)]
pub struct SecretsEngines {
    /// AWS engines
    pub aws: IndexMap<MountPath, AwsEngine>,
    /// GCP engines
    pub gcp: IndexMap<MountPath, GcpEngine>,
}

/// Reads and substitutes the configuration tree.
pub struct ConfigLoader {
    root: PathBuf,
    substitutor: Substitutor,
    hooks: Arc<HookRegistry>,
}

impl ConfigLoader {
    /// Create a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, substitutor: Substitutor, hooks: Arc<HookRegistry>) -> Self {
        Self {
            root: root.into(),
            substitutor,
            hooks,
        }
    }

    /// Root of the configuration tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the requested kinds.
    pub async fn load_all(&self, include_auth: bool, include_engines: bool) -> Result<DeclaredState> {
        let mut state = DeclaredState::default();

        if include_auth {
            state.auth_methods = Some(self.load_auth_methods().await?);
        }
        if include_engines {
            let engines = self.load_secrets_engines().await?;
            state.aws_engines = Some(engines.aws);
            state.gcp_engines = Some(engines.gcp);
        }

        Ok(state)
    }

    /// Load `auth_methods/*`.
    pub async fn load_auth_methods(&self) -> Result<IndexMap<MountPath, AuthMethod>> {
        let mut methods = IndexMap::new();

        for file in read_config_dir(&self.root.join(AUTH_DIR))? {
            let logical = format!("{}/{}", AUTH_DIR, file.name);
            let parsed: AuthMethodFile = self.parse_file(&file, &logical).await?;
            let method = AuthMethod::from_file(&file.name, parsed)?;
            self.hooks.validate(&method)?;

            debug!("Loaded auth method [{}] ({})", method.path, method.options.mount_type);
            methods.insert(method.path.clone(), method);
        }

        info!("Loaded {} auth method(s)", methods.len());
        Ok(methods)
    }

    /// Load `secrets-engines/*/`.
    pub async fn load_secrets_engines(&self) -> Result<SecretsEngines> {
        let mut engines = SecretsEngines::default();

        for (name, dir) in list_subdirs(&self.root.join(ENGINES_DIR))? {
            let files = read_config_dir(&dir)?;
            let aws = files.iter().find(|f| f.name == "aws");
            let gcp = files.iter().find(|f| f.name == "gcp");
            let logical = format!("{}/{}", ENGINES_DIR, name);

            match (aws, gcp) {
                (Some(_), Some(_)) => {
                    bail!(Load, "Secrets engine directory [{}] declares both aws and gcp", dir.display());
                }
                (Some(file), None) => {
                    let parsed: AwsEngineFile = self.parse_file(file, &logical).await?;
                    let roles = self.load_aws_roles(&dir.join("roles"), &logical).await?;
                    let engine = AwsEngine::new(&name, parsed, roles)?;
                    debug!("Loaded AWS secrets engine [{}] with {} role(s)", engine.path, engine.roles.len());
                    engines.aws.insert(engine.path.clone(), engine);
                }
                (None, Some(file)) => {
                    let parsed: GcpEngineFile = self.parse_file(file, &logical).await?;
                    let rolesets = self.load_gcp_rolesets(&dir.join("rolesets"), &logical).await?;
                    let engine = GcpEngine::new(&name, parsed, rolesets)?;
                    debug!("Loaded GCP secrets engine [{}] with {} roleset(s)", engine.path, engine.rolesets.len());
                    engines.gcp.insert(engine.path.clone(), engine);
                }
                (None, None) => {
                    warn!(
                        "Secrets engine directory [{}] has no aws or gcp configuration, skipping",
                        dir.display()
                    );
                }
            }
        }

        info!(
            "Loaded {} AWS and {} GCP secrets engine(s)",
            engines.aws.len(),
            engines.gcp.len()
        );
        Ok(engines)
    }

    async fn load_aws_roles(&self, dir: &Path, logical: &str) -> Result<IndexMap<String, AwsRole>> {
        let mut roles = IndexMap::new();
        for file in read_config_dir(dir)? {
            let policy = self.render_file(&file, logical).await?;
            roles.insert(file.name, AwsRole { policy });
        }
        Ok(roles)
    }

    async fn load_gcp_rolesets(&self, dir: &Path, logical: &str) -> Result<IndexMap<String, GcpRoleSet>> {
        let mut rolesets = IndexMap::new();
        for file in read_config_dir(dir)? {
            let roleset: GcpRoleSet = self.parse_file(&file, logical).await?;
            rolesets.insert(file.name, roleset);
        }
        Ok(rolesets)
    }

    /// Validate, substitute and re-validate a file, returning the text.
    async fn render_file(&self, file: &ConfigFile, logical: &str) -> Result<String> {
        file.format.validate(&file.content, &file.path)?;

        let rendered = self.substitutor.render(&file.content, logical).await?;

        file.format.validate(&rendered, &file.path).map_err(|e| {
            SyncError::Load(format!(
                "Configuration file [{}] is not valid after secret substitution: {}",
                file.path.display(),
                e
            ))
        })?;

        Ok(rendered)
    }

    async fn parse_file<T: DeserializeOwned>(&self, file: &ConfigFile, logical: &str) -> Result<T> {
        let rendered = self.render_file(file, logical).await?;
        file.format.parse(&rendered, &file.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVault;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use vaultsync_types::MountInfo;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn loader(root: &Path, fake: FakeVault) -> ConfigLoader {
        let fake = Arc::new(fake.with_mount("secret", MountInfo::new("kv").with_option("version", "2")));
        ConfigLoader::new(
            root,
            Substitutor::new(fake, "secret/vaultsync/"),
            Arc::new(HookRegistry::default()),
        )
    }

    #[tokio::test]
    async fn test_load_auth_methods_with_substitution() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "auth_methods/ldap.json",
            r#"{"auth_options": {"type": "ldap"}, "config": {"bindpass": "%{bindpass}%"}}"#,
        );
        write(dir.path(), "auth_methods/notes.txt", "ignored");

        let fake = FakeVault::new().with_data(
            "secret/data/vaultsync/auth_methods/ldap",
            json!({"data": {"bindpass": "hunter2"}}),
        );
        let methods = loader(dir.path(), fake).load_auth_methods().await.unwrap();

        assert_eq!(methods.len(), 1);
        let ldap = &methods[&MountPath::new("ldap").unwrap()];
        assert_eq!(ldap.config.as_ref().unwrap()["bindpass"], "hunter2");
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "secrets-engines/aws/aws.json",
            r#"{"root_config": {"access_key": "%{access_key}%", "secret_key": "%{secret_key}%"}}"#,
        );

        let fake = FakeVault::new().with_data(
            "secret/data/vaultsync/secrets-engines/aws",
            json!({"data": {"access_key": "AKIA"}}),
        );
        let err = loader(dir.path(), fake).load_secrets_engines().await.unwrap_err();

        match err {
            SyncError::Substitution { tokens, .. } => assert_eq!(tokens, vec!["%{secret_key}%"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth_methods/broken.json", "{ not json");

        let err = loader(dir.path(), FakeVault::new()).load_auth_methods().await.unwrap_err();
        assert!(matches!(err, SyncError::Load(_)));
    }

    #[tokio::test]
    async fn test_invalid_after_substitution_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth_methods/ldap.json", r#"{"auth_options": {"type": "ldap"}, "config": {"x": "%{v}%"}}"#);

        let fake = FakeVault::new().with_data(
            "secret/data/vaultsync/auth_methods/ldap",
            json!({"data": {"v": "a\"b"}}),
        );
        let err = loader(dir.path(), fake).load_auth_methods().await.unwrap_err();
        assert!(err.to_string().contains("after secret substitution"));
    }

    #[tokio::test]
    async fn test_yaml_is_unsupported() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth_methods/ldap.yml", "auth_options:\n  type: ldap\n");

        let err = loader(dir.path(), FakeVault::new()).load_auth_methods().await.unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_load_engines() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secrets-engines/aws-prod/aws.json", r#"{"config_lease": {"lease": "1h", "lease_max": "2h"}}"#);
        write(dir.path(), "secrets-engines/aws-prod/roles/deploy.json", r#"{"Version": "2012-10-17"}"#);
        write(dir.path(), "secrets-engines/gcp/gcp.json", r#"{"config_lease": {"ttl": "60"}}"#);
        write(
            dir.path(),
            "secrets-engines/gcp/rolesets/viewer.json",
            r#"{"project": "p", "bindings": [{"resource": "r", "roles": ["roles/viewer"]}]}"#,
        );
        fs::create_dir_all(dir.path().join("secrets-engines/empty")).unwrap();

        let engines = loader(dir.path(), FakeVault::new()).load_secrets_engines().await.unwrap();

        let aws = &engines.aws[&MountPath::new("aws-prod").unwrap()];
        assert_eq!(aws.roles["deploy"].policy, r#"{"Version": "2012-10-17"}"#);
        let gcp = &engines.gcp[&MountPath::new("gcp").unwrap()];
        assert_eq!(gcp.rolesets["viewer"].bindings[0].roles, vec!["roles/viewer"]);
    }

    #[tokio::test]
    async fn test_engine_dir_with_both_files_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secrets-engines/cloud/aws.json", "{}");
        write(dir.path(), "secrets-engines/cloud/gcp.json", "{}");

        assert!(loader(dir.path(), FakeVault::new()).load_secrets_engines().await.is_err());
    }

    #[tokio::test]
    async fn test_skipped_kinds_are_none() {
        let dir = TempDir::new().unwrap();
        let state = loader(dir.path(), FakeVault::new()).load_all(false, true).await.unwrap();

        assert!(state.auth_methods.is_none());
        assert!(state.aws_engines.unwrap().is_empty());
        assert_eq!(state.gcp_engines.map(|g| g.len()), Some(0));
    }
}
