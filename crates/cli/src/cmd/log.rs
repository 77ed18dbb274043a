//! Show snapshot timeline

use anyhow::{Context, Result};
use cli_lib::util;
use cli_lib::workspace::Workspace;
use owo_colors::OwoColorize;

pub async fn run(limit: Option<usize>) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;

    let workspace = Workspace::open(paths)?;
    let document = workspace.load_document()?;

    let limit = limit.unwrap_or(20);
    let snapshots = workspace.journal.last_n(&document.id, limit)?;

    if snapshots.is_empty() {
        println!("{}", "No snapshots yet".dimmed());
        return Ok(());
    }

    println!(
        "{} ({} of {})",
        "Snapshot Timeline".bold(),
        snapshots.len(),
        workspace.journal.list(&document.id)?.len()
    );
    println!();

    // Newest first
    for snap in snapshots.iter().rev() {
        util::display_snapshot_compact(snap);
    }

    Ok(())
}
