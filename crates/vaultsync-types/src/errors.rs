//! Error types for vaultsync operations.

use thiserror::Error;

/// The main error type for vaultsync operations.
///
/// Variants follow the failure taxonomy of a sync run: load-time problems
/// with the configuration tree, resolution problems while substituting
/// secrets, and failures talking to the backend.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Tool configuration error (settings file, flags, environment)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration tree could not be loaded
    #[error("Load error: {0}")]
    Load(String),

    /// A configuration file uses a format that is recognised but not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Placeholders were left unresolved after substitution
    #[error(
        "The following substitutions were detected but not found in Vault path [{path}]: {}",
        tokens.join(", ")
    )]
    Substitution {
        /// Secret path the placeholders were resolved against
        path: String,
        /// Every unresolved placeholder token, in order of first appearance
        tokens: Vec<String>,
    },

    /// A secret could not be interpreted as a flat string map
    #[error("Secret format error: {0}")]
    SecretFormat(String),

    /// The mount owning a path is not a key-value store
    #[error("cannot determine kv version; mountpoint '{0}' is not a kv secret backend")]
    NotAKvMount(String),

    /// No mount owns the given path
    #[error("cannot determine kv version; no mountpoint found for '{0}'")]
    MountNotFound(String),

    /// A declared mount exists in the backend with a different type
    #[error("Mount path {path} exists but doesn't match type: {live} != {declared}")]
    TypeMismatch {
        /// Mount path
        path: String,
        /// Type reported by the backend
        live: String,
        /// Type declared in configuration
        declared: String,
    },

    /// Vault operation error
    #[error("Vault error: {0}")]
    Vault(String),

    /// A queued task failed
    #[error("Task failed: {0}")]
    Task(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal bug - should never happen in production
    #[error("Bug detected: {0}\n\nThis is an internal error. Please report this issue at:\nhttps://github.com/vaultsync/vaultsync/issues")]
    Bug(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for vaultsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Helper macro to create and return a SyncError::Bug
///
/// This should be used for conditions that should never occur
/// in normal operation and indicate a bug in vaultsync itself.
#[macro_export]
macro_rules! bug {
    ($msg:expr) => {
        return Err($crate::SyncError::Bug($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::SyncError::Bug(format!($fmt, $($arg)*)))
    };
}

/// Helper macro to bail out with a SyncError
///
/// # Example
///
/// ```ignore
/// if !valid {
///     bail!(Load, "Invalid configuration: {}", reason);
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($variant:ident, $msg:expr) => {
        return Err($crate::SyncError::$variant($msg.to_string()))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::SyncError::$variant(format!($fmt, $($arg)*)))
    };
    ($msg:expr) => {
        return Err($crate::SyncError::Other($msg.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::SyncError::Other(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_error_names_every_token() {
        let err = SyncError::Substitution {
            path: "secret/vaultsync/auth_methods/ldap".to_string(),
            tokens: vec!["%{bind_pass}%".to_string(), "%{url}%".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("secret/vaultsync/auth_methods/ldap"));
        assert!(msg.contains("%{bind_pass}%, %{url}%"));
    }

    #[test]
    fn test_bail_macro() {
        fn check(ok: bool) -> Result<()> {
            if !ok {
                bail!(Load, "bad file {}", "x.json");
            }
            Ok(())
        }

        assert!(check(true).is_ok());
        match check(false) {
            Err(SyncError::Load(msg)) => assert_eq!(msg, "bad file x.json"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
