//! Reconcile the backend with the configuration tree.

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use vaultsync_core::AppConfig;
use vaultsync_engine::{HookRegistry, Syncer};

use crate::ui::prompt::TerminalPrompt;

pub async fn execute(app: &AppConfig, skip_auth_methods: bool, skip_secrets_engines: bool) -> Result<()> {
    println!(
        "{} {}",
        "Syncing".green().bold(),
        app.sync.configuration_path.display().to_string().cyan()
    );

    let backend = super::connect(app)?;
    let hooks = Arc::new(HookRegistry::default());

    let declared = super::loader(app, backend.clone(), hooks.clone())
        .load_all(!skip_auth_methods, !skip_secrets_engines)
        .await?;

    let syncer = Syncer::new(backend, &app.sync, Box::new(TerminalPrompt));
    let summary = syncer.run(declared.into_reconcilers(hooks)).await?;

    for kind in &summary.kinds {
        println!(
            "  {} {}: {} declared, {} writes, {} deleted, {} kept",
            "✓".green(),
            kind.kind.to_string().cyan(),
            kind.declared,
            kind.writes,
            kind.deleted.len(),
            kind.kept.len()
        );
        for path in &kind.kept {
            println!("    {} {} left in place", "!".yellow(), path);
        }
    }

    println!(
        "{} {} writes, {} deletes",
        "Done.".green().bold(),
        summary.writes(),
        summary.deleted()
    );

    Ok(())
}
