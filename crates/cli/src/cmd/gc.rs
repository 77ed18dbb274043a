//! Run garbage collection on snapshots

use anyhow::{Context, Result};
use cli_lib::workspace::Workspace;
use cli_lib::{config, util};
use journal::GarbageCollector;
use owo_colors::OwoColorize;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn run() -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;
    let system = config::load()?;

    let size_before = util::calculate_dir_size(&paths.journal_dir())?;
    let workspace = Workspace::open(paths)?;
    let gc = GarbageCollector::new(system.retention_policy());

    println!("{}", "Running Garbage Collection...".bold());
    println!();

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_millis() as u64;
    let metrics = gc.collect(&workspace.journal, now_ms)?;

    println!("{}", "GC Complete".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if metrics.snapshots_deleted == 0 {
        println!("{}", "No garbage found - history is already within retention".dimmed());
    } else {
        println!(
            "Snapshots deleted:   {}",
            metrics.snapshots_deleted.to_string().yellow()
        );
        println!("Snapshots kept:      {}", metrics.snapshots_after);
    }
    println!(
        "Journal size:        {}",
        util::format_size(size_before).dimmed()
    );

    Ok(())
}
