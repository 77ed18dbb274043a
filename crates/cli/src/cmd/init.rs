//! Initialize a Savepoint workspace

use anyhow::{Context, Result};
use cli_lib::workspace::Workspace;
use owo_colors::OwoColorize;
use std::env;

pub async fn run(title: &str) -> Result<()> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;

    println!(
        "Initializing Savepoint workspace at {}",
        current_dir.display()
    );

    let (workspace, document) = Workspace::init(&current_dir, title)?;

    println!("{} Workspace {}", "✓".green(), document.id.to_string().cyan());
    println!("  Title:     {}", document.title);
    println!("  Document:  {}", workspace.paths.document.display());
    println!();
    println!("Created .sp/ directory structure:");
    println!("  - .sp/store/     (saved workspace heads)");
    println!("  - .sp/journal/   (snapshot history)");
    println!("  - .sp/logs/      (edit session logs)");
    println!("  - .sp/locks/     (session lock)");
    println!();
    println!("Next steps:");
    println!("  - Run 'sp edit' and change workspace.json in your editor");
    println!("  - Run 'sp status' to check save status");
    Ok(())
}
