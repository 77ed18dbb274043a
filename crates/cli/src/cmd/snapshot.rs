//! Save and record a snapshot

use anyhow::{Context, Result};
use cli_lib::session::{SaveContext, SessionObserver};
use cli_lib::workspace::Workspace;
use cli_lib::{config, util};
use coordinator::AutosaveCoordinator;
use journal::{Recorded, SnapshotReason};
use owo_colors::OwoColorize;
use std::sync::Arc;

pub async fn run(label: Option<String>) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;
    let system = config::load()?;

    let workspace = Workspace::open(paths)?;
    let document = workspace.load_document()?;

    // Snapshot what is stored, so save first
    let context = SaveContext::new(&workspace, document.id, 0);
    let coordinator =
        AutosaveCoordinator::spawn(system.autosave_config(), Arc::new(SessionObserver::default()))?;
    let result = coordinator.save_now(context.task()).await;
    coordinator.shutdown();
    result.context("Save failed")?;

    let head = workspace.store.head(&document.id)?;
    match workspace
        .journal
        .record(&head.document, SnapshotReason::Manual, label)?
    {
        Recorded::Created(snap) => {
            println!("{} Snapshot {}", "✓".green(), snap.id.to_string().yellow());
            if let Some(label) = &snap.label {
                println!("  Label: {}", label.green());
            }
        }
        Recorded::Unchanged(snap) => {
            println!(
                "No changes since snapshot {} ({})",
                snap.id.to_string().yellow(),
                util::format_relative_time(snap.ts_unix_ms).dimmed()
            );
        }
    }
    Ok(())
}
