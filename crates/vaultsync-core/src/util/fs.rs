//! Configuration tree file helpers.

use vaultsync_types::{bail, Result, SyncError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Structured-data formats recognised in the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml` (recognised, not yet supported)
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }

    /// Check that `content` is a syntactically valid document.
    pub fn validate(&self, content: &str, origin: &Path) -> Result<()> {
        self.parse::<Map<String, Value>>(content, origin).map(|_| ())
    }

    /// Parse `content` into a typed document.
    pub fn parse<T: DeserializeOwned>(&self, content: &str, origin: &Path) -> Result<T> {
        match self {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                SyncError::Load(format!("Configuration file [{}] is not valid JSON: {}", origin.display(), e))
            }),
            ConfigFormat::Yaml => Err(SyncError::UnsupportedFormat(format!(
                "Configuration file [{}]: YAML is not yet supported",
                origin.display()
            ))),
        }
    }
}

/// A configuration file read from disk.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// File name without extension; the logical resource name
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Detected format
    pub format: ConfigFormat,
    /// Raw file content
    pub content: String,
}

/// Read every recognised configuration file directly inside `dir`.
///
/// A missing directory yields no files. Files with an unrecognised
/// extension are skipped with a warning. Two files sharing a name
/// (e.g. `ldap.json` and `ldap.yaml`) are a load error.
pub fn read_config_dir(dir: &Path) -> Result<Vec<ConfigFile>> {
    if !dir.is_dir() {
        debug!("Configuration directory [{}] not found, nothing to load", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut names = HashSet::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SyncError::Load(format!("Error reading configuration directory [{}]: {}", dir.display(), e))
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() {
            debug!("Skipping non-file entry [{}]", path.display());
            continue;
        }

        let Some(format) = ConfigFormat::from_path(path) else {
            warn!(
                "Configuration file [{}] does not have a valid json/yaml extension and will not be processed",
                path.display()
            );
            continue;
        };

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SyncError::Load(format!("Invalid file name [{}]", path.display())))?
            .to_string();

        if !names.insert(name.clone()) {
            bail!(
                Load,
                "Configuration name collision: more than one file in [{}] is named '{}'",
                dir.display(),
                name
            );
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SyncError::Load(format!("Error reading file [{}]: {}", path.display(), e)))?;

        files.push(ConfigFile {
            name,
            path: path.to_path_buf(),
            format,
            content,
        });
    }

    Ok(files)
}

/// List the immediate subdirectories of `dir` as (name, path) pairs.
pub fn list_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        debug!("Configuration directory [{}] not found, nothing to load", dir.display());
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SyncError::Load(format!("Error reading configuration directory [{}]: {}", dir.display(), e))
        })?;

        if !entry.file_type().is_dir() {
            continue;
        }

        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path().to_path_buf()));
        }
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_config_dir_skips_unknown_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ldap.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();
        fs::write(dir.path().join("github.json"), "{\"a\": 1}").unwrap();

        let files = read_config_dir(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["github", "ldap"]);
        assert_eq!(files[0].format, ConfigFormat::Json);
    }

    #[test]
    fn test_read_config_dir_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(read_config_dir(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn test_read_config_dir_name_collision() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ldap.json"), "{}").unwrap();
        fs::write(dir.path().join("ldap.yaml"), "a: 1").unwrap();

        let err = read_config_dir(dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::Load(ref m) if m.contains("collision")));
    }

    #[test]
    fn test_yaml_is_unsupported() {
        let result = ConfigFormat::Yaml.validate("a: 1", Path::new("x.yaml"));
        assert!(matches!(result, Err(SyncError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_json_must_be_object() {
        assert!(ConfigFormat::Json.validate("{\"a\": 1}", Path::new("x.json")).is_ok());
        assert!(ConfigFormat::Json.validate("[1, 2]", Path::new("x.json")).is_err());
        assert!(ConfigFormat::Json.validate("{ nope", Path::new("x.json")).is_err());
    }

    #[test]
    fn test_list_subdirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("gcp")).unwrap();
        fs::create_dir(dir.path().join("aws")).unwrap();
        fs::write(dir.path().join("stray.json"), "{}").unwrap();

        let names: Vec<_> = list_subdirs(dir.path()).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["aws", "gcp"]);
    }
}
