//! Save workspace.json once, with retries

use anyhow::{Context, Result};
use cli_lib::session::{SaveContext, SessionObserver};
use cli_lib::workspace::Workspace;
use cli_lib::{config, util};
use coordinator::AutosaveCoordinator;
use owo_colors::OwoColorize;
use std::sync::Arc;

pub async fn run() -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;
    let system = config::load()?;

    let workspace = Workspace::open(paths)?;
    let document = workspace.load_document()?;

    // Autosnapshots belong to edit sessions
    let context = SaveContext::new(&workspace, document.id, 0);
    let coordinator =
        AutosaveCoordinator::spawn(system.autosave_config(), Arc::new(SessionObserver::default()))?;

    let result = coordinator.save_now(context.task()).await;
    coordinator.shutdown();
    let saved_at = result.context("Save failed")?;

    let head = workspace.store.head(&document.id)?;
    println!(
        "{} Saved revision {} at {}",
        "✓".green(),
        head.revision.to_string().yellow(),
        util::format_absolute_time(saved_at.as_unix_ms())
    );
    Ok(())
}
