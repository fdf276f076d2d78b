//! Rotate root credentials of every supported secrets engine.

use anyhow::Result;
use colored::Colorize;
use vaultsync_core::AppConfig;
use vaultsync_engine::rotate_root_credentials;

pub async fn execute(app: &AppConfig, json: bool) -> Result<()> {
    let backend = super::connect(app)?;

    if json {
        let report = rotate_root_credentials(backend.as_ref()).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} root credentials", "Rotating".green().bold());
    let report = rotate_root_credentials(backend.as_ref()).await?;

    for mount in &report.rotated {
        println!(
            "  {} {} ({}) {}",
            "✓".green(),
            mount.path.cyan(),
            mount.mount_type,
            mount.key_id.as_deref().unwrap_or("-")
        );
    }
    for failure in &report.failed {
        println!("  {} {} {}", "✗".red(), failure.path.cyan(), failure.error);
    }

    if report.rotated.is_empty() && report.failed.is_empty() {
        println!("  {} No AWS or GCP secrets engines mounted", "!".yellow());
    } else if !report.is_clean() {
        println!(
            "{} {} of {} mounts could not be rotated",
            "Warning:".yellow().bold(),
            report.failed.len(),
            report.rotated.len() + report.failed.len()
        );
    }

    Ok(())
}
