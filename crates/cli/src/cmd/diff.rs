//! Show diff between snapshots

use anyhow::{Context, Result};
use cli_lib::workspace::Workspace;
use cli_lib::{diff_utils, util};
use owo_colors::OwoColorize;

pub async fn run(reference_a: &str, reference_b: Option<&str>, context: usize) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    paths.ensure_no_session()?;

    let workspace = Workspace::open(paths)?;
    let snap_a = workspace.journal.resolve(reference_a)?;

    let (label_b, doc_b) = match reference_b {
        Some(reference) => {
            let snap_b = workspace.journal.resolve(reference)?;
            (
                format!(
                    "{} {}",
                    snap_b.short_id().yellow(),
                    util::format_relative_time(snap_b.ts_unix_ms).dimmed()
                ),
                snap_b.document,
            )
        }
        None => (
            "workspace.json".cyan().to_string(),
            workspace.load_document()?,
        ),
    };

    println!("{}", "Diff Summary".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!(
        "From: {} {}",
        snap_a.short_id().yellow(),
        util::format_relative_time(snap_a.ts_unix_ms).dimmed()
    );
    println!("To:   {}", label_b);
    println!();

    let sections = diff_utils::changed_sections(&snap_a.document, &doc_b);
    if sections.is_empty() {
        println!("{}", "No changes".dimmed());
        return Ok(());
    }

    println!("{} changed section(s)", sections.len());
    println!();
    print!(
        "{}",
        diff_utils::render_document_diff(&snap_a.document, &doc_b, context)
    );
    Ok(())
}
