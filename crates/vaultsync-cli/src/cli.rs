//! CLI structure and command definitions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vaultsync_core::AppConfig;
use vaultsync_types::{LogFormat, LogLevel};

#[derive(Parser)]
#[command(name = "vaultsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative Vault configuration reconciler", long_about = None)]
#[command(after_help = "Settings resolve in order: built-in defaults, the settings file, command-line flags, then VAULT_* and VAULTSYNC_* environment variables. An exported variable wins over the matching flag.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to ~/.vaultsync/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of the configuration tree [VAULTSYNC_CONFIGURATION_PATH takes precedence]
    #[arg(long, global = true)]
    pub configuration_path: Option<PathBuf>,

    /// Number of concurrent write workers [VAULTSYNC_WORKERS takes precedence]
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile auth methods and secrets engines with the configuration tree
    Sync {
        /// Leave auth methods untouched
        #[arg(long)]
        skip_auth_methods: bool,

        /// Leave secrets engines untouched
        #[arg(long)]
        skip_secrets_engines: bool,
    },

    /// Rotate root credentials of every AWS and GCP secrets engine
    #[command(name = "rotate-creds")]
    RotateCreds {
        /// Print the rotation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and substitute the configuration tree without changing Vault
    Check,
}

impl Cli {
    /// Resolve settings from file, flags and environment.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::layered(self.config.as_deref()).context("Failed to load settings")?;

        if let Some(path) = &self.configuration_path {
            config.set("sync.configuration_path", path)?;
        }
        if let Some(workers) = self.workers {
            config.set("sync.workers", workers)?;
        }
        if let Some(format) = self.log_format {
            config.set("log.format", format)?;
        }
        match (self.log_level, self.verbose) {
            (Some(level), _) => config.set("log.level", level)?,
            (None, true) => config.set("log.level", LogLevel::Debug)?,
            (None, false) => {}
        }

        AppConfig::from_config(&config).context("Invalid settings")
    }

    pub async fn execute(&self, app: &AppConfig) -> Result<()> {
        use crate::commands::*;

        match &self.command {
            Commands::Sync {
                skip_auth_methods,
                skip_secrets_engines,
            } => sync::execute(app, *skip_auth_methods, *skip_secrets_engines).await,
            Commands::RotateCreds { json } => rotate::execute(app, *json).await,
            Commands::Check => check::execute(app).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "vaultsync",
            "--workers",
            "4",
            "--log-level",
            "debug",
            "sync",
            "--skip-auth-methods",
        ])
        .unwrap();

        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert!(matches!(
            cli.command,
            Commands::Sync {
                skip_auth_methods: true,
                skip_secrets_engines: false
            }
        ));
    }

    #[test]
    fn test_help_states_environment_precedence() {
        let command = Cli::command();
        let workers = command
            .get_arguments()
            .find(|arg| arg.get_id() == "workers")
            .and_then(|arg| arg.get_help())
            .unwrap()
            .to_string();
        assert!(workers.contains("VAULTSYNC_WORKERS takes precedence"));

        let after = command.get_after_help().unwrap().to_string();
        assert!(after.contains("An exported variable wins over the matching flag"));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["vaultsync", "--log-format", "xml", "check"]).is_err());
    }
}
