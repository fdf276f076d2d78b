//! Root credential rotation for cloud secrets engines.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Map;
use tracing::{info, warn};
use vaultsync_types::{ResourceKind, Result, VaultBackend};

/// A mount whose root credentials were rotated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotatedMount {
    /// Mount path
    pub path: String,
    /// Mount type
    pub mount_type: String,
    /// New `access_key` (AWS) or `private_key_id` (GCP), when reported
    pub key_id: Option<String>,
    /// When the rotation completed
    pub rotated_at: DateTime<Utc>,
}

/// A mount whose rotation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRotation {
    /// Mount path
    pub path: String,
    /// Error message
    pub error: String,
}

/// Per-mount outcome of a rotation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RotationReport {
    /// Successful rotations
    pub rotated: Vec<RotatedMount>,
    /// Failed rotations
    pub failed: Vec<FailedRotation>,
}

impl RotationReport {
    /// Whether every attempted rotation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn key_field(mount_type: &str) -> &'static str {
    match mount_type {
        "gcp" => "private_key_id",
        _ => "access_key",
    }
}

/// Rotate the root credentials of every rotation-capable mount.
///
/// Each mount is attempted independently; a failure is recorded and the
/// job moves on. Only listing the mounts can fail the job as a whole.
pub async fn rotate_root_credentials(backend: &dyn VaultBackend) -> Result<RotationReport> {
    let mounts = backend.list_mounts().await?;

    let mut targets: Vec<_> = mounts
        .into_iter()
        .filter(|(_, info)| ResourceKind::supports_rotation(&info.mount_type))
        .collect();
    targets.sort_by(|a, b| a.0.cmp(&b.0));

    let mut report = RotationReport::default();
    for (path, info) in targets {
        let rotate_path = format!("{}config/rotate-root", path);

        match backend.write(&rotate_path, &Map::new()).await {
            Ok(secret) => {
                let field = key_field(&info.mount_type);
                let key_id = secret
                    .as_ref()
                    .and_then(|s| s.data.get(field))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);

                info!(
                    "Rotated key for [{}].  New {}: {}",
                    path,
                    field,
                    key_id.as_deref().unwrap_or("<not reported>")
                );
                report.rotated.push(RotatedMount {
                    path,
                    mount_type: info.mount_type,
                    key_id,
                    rotated_at: Utc::now(),
                });
            }
            Err(e) => {
                warn!("Cannot rotate [{}] {}", path, e);
                report.failed.push(FailedRotation {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
