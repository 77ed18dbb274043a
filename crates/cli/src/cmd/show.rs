//! Show snapshot details

use anyhow::{Context, Result};
use cli_lib::workspace::Workspace;
use cli_lib::{diff_utils, util};
use owo_colors::OwoColorize;

pub async fn run(reference: &str, show_diff: bool) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;

    let workspace = Workspace::open(paths)?;
    let snap = workspace.journal.resolve(reference)?;

    println!("{} {}", "snapshot".yellow().bold(), snap.id.to_string().cyan());
    match snap.parent {
        Some(parent) => println!("{} {}", "Parent:    ".dimmed(), parent.to_string().cyan()),
        None => println!("{} {}", "Parent:    ".dimmed(), "(none - first snapshot)".dimmed()),
    }
    println!(
        "{} {} ({})",
        "Date:      ".dimmed(),
        util::format_absolute_time(snap.ts_unix_ms),
        util::format_relative_time(snap.ts_unix_ms).dimmed()
    );
    println!("{} {}", "Reason:    ".dimmed(), snap.reason.as_str());
    if let Some(label) = &snap.label {
        println!("{} {}", "Label:     ".dimmed(), label.green());
    }
    println!("{} {}", "Hash:      ".dimmed(), snap.content_hash.short().bright_green());

    let doc = &snap.document;
    println!("\n{}", doc.title.bold());
    if !doc.description.is_empty() {
        println!("{}", doc.description);
    }
    println!();
    for (block, text) in &doc.canvas {
        if text.trim().is_empty() {
            continue;
        }
        println!("  {}", block.title().cyan());
        for line in text.lines() {
            println!("    {}", line);
        }
    }
    if !doc.evidence.is_empty() {
        println!("\n{} ({} files)", "Evidence:".bold(), doc.evidence.len());
        for evidence in &doc.evidence {
            println!("  {} {}", evidence.name, evidence.uri.dimmed());
        }
    }

    if show_diff {
        println!("\n{}", "Diff:".bold());
        match snap.parent {
            Some(parent_id) => match workspace.journal.get(&parent_id)? {
                Some(parent) => {
                    print!(
                        "{}",
                        diff_utils::render_document_diff(&parent.document, doc, 3)
                    );
                }
                None => println!("  {}", "(parent was garbage collected)".dimmed()),
            },
            None => println!("  {}", "(first snapshot)".dimmed()),
        }
    }

    Ok(())
}
