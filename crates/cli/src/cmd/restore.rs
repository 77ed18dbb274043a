//! Restore workspace.json to a snapshot

use anyhow::{Context, Result};
use cli_lib::workspace::Workspace;
use cli_lib::{diff_utils, util};
use owo_colors::OwoColorize;

pub async fn run(reference: &str, yes: bool) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;

    let workspace = Workspace::open(paths)?;
    let snap = workspace.journal.resolve(reference)?;

    if let Ok(current) = workspace.load_document() {
        let sections = diff_utils::changed_sections(&current, &snap.document);
        if sections.is_empty() {
            println!("{}", "workspace.json already matches that snapshot".dimmed());
            return Ok(());
        }
        println!(
            "Restoring {} will change: {}",
            snap.short_id().yellow(),
            sections
                .iter()
                .map(|s| s.heading())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if !yes && !util::confirm("Replace workspace.json?")? {
        println!("Restore cancelled");
        return Ok(());
    }

    let safety = workspace.restore(&snap.document)?;

    println!(
        "{} Restored snapshot {}",
        "✓".green(),
        snap.id.to_string().yellow()
    );
    println!(
        "  Previous version kept as {}",
        safety.snapshot().short_id().yellow()
    );
    Ok(())
}
