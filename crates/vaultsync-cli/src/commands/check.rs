//! Load the configuration tree without changing the backend.

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use vaultsync_core::AppConfig;
use vaultsync_engine::HookRegistry;

pub async fn execute(app: &AppConfig) -> Result<()> {
    println!(
        "{} {}",
        "Checking".green().bold(),
        app.sync.configuration_path.display().to_string().cyan()
    );

    let backend = super::connect(app)?;
    let hooks = Arc::new(HookRegistry::default());
    let declared = super::loader(app, backend, hooks).load_all(true, true).await?;

    if let Some(methods) = &declared.auth_methods {
        println!("\n{}:", "Auth methods".cyan().bold());
        for method in methods.values() {
            println!("  {} ({})", method.path, method.options.mount_type);
        }
    }
    if let Some(engines) = &declared.aws_engines {
        println!("\n{}:", "AWS secrets engines".cyan().bold());
        for engine in engines.values() {
            println!("  {} ({} roles)", engine.path, engine.roles.len());
        }
    }
    if let Some(engines) = &declared.gcp_engines {
        println!("\n{}:", "GCP secrets engines".cyan().bold());
        for engine in engines.values() {
            println!("  {} ({} rolesets)", engine.path, engine.rolesets.len());
        }
    }

    println!("\n{} Configuration is valid", "✓".green());
    Ok(())
}
