//! Show workspace and save status

use anyhow::{Context, Result};
use cli_lib::locks::SessionLock;
use cli_lib::util;
use cli_lib::workspace::Workspace;
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;

    println!("{}", "Workspace Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Workspace:     {}", paths.root.display().to_string().cyan());

    let document = util::load_document(&paths);
    match &document {
        Ok(doc) => {
            println!("Title:         {}", doc.title);
            println!("ID:            {}", doc.id.to_string().dimmed());
            println!("Canvas:        {}/9 blocks filled", doc.filled_blocks());
            println!("Evidence:      {} files", doc.evidence.len());
            if doc.published {
                println!("Published:     {}", "yes".green());
            }
        }
        Err(e) => println!("Document:      {} {:#}", "unreadable:".red(), e),
    }
    println!();

    // The store is locked while a session runs
    if let Some(holder) = SessionLock::holder(&paths.state_dir)? {
        println!("Session:       {}", "Editing ✓".green());
        println!("  PID:         {}", holder.pid);
        println!(
            "  Started:     {}",
            util::format_relative_time(holder.started_at)
        );
        println!();
        println!(
            "{}",
            "Save details are shown by the session itself ('status' at its prompt).".dimmed()
        );
        return Ok(());
    }
    println!("Session:       {}", "Not running".yellow());
    println!();

    let total_size = util::calculate_dir_size(&paths.state_dir)?;
    let workspace = Workspace::open(paths)?;

    println!("Last save:");
    let doc = match document {
        Ok(doc) => doc,
        Err(_) => return Ok(()),
    };
    match workspace.store.get(&doc.id)? {
        Some(head) => {
            println!("  Revision:    {}", head.revision.to_string().yellow());
            println!(
                "  Time:        {} ({})",
                util::format_relative_time(head.saved_at_ms),
                util::format_absolute_time(head.saved_at_ms).dimmed()
            );
            if head.content_hash == doc.content_hash() {
                println!("  State:       {}", "All changes saved".green());
            } else {
                println!("  State:       {}", "Unsaved changes".yellow());
                println!("  {}", "Tip: run 'sp save' or start 'sp edit'".dimmed());
            }
        }
        None => println!("  {}", "Never saved".dimmed()),
    }
    println!();

    println!("Snapshots:");
    println!("  Count:       {}", workspace.journal.count());
    if let Some(latest) = workspace.journal.latest(&doc.id)? {
        print!("  Latest:      ");
        util::display_snapshot_compact(&latest);
    }
    println!("  Total size:  {}", util::format_size(total_size));

    Ok(())
}
