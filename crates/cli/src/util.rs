//! Shared utilities for CLI commands

use crate::locks::SessionLock;
use anyhow::{Context, Result};
use journal::{Snapshot, WorkspaceDocument};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Name of the state directory at the workspace root
pub const STATE_DIR: &str = ".sp";

/// Name of the edited document at the workspace root
pub const DOCUMENT_FILE: &str = "workspace.json";

/// Well-known locations inside a workspace
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub document: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: &Path) -> Self {
        let state_dir = root.join(STATE_DIR);
        Self {
            root: root.to_path_buf(),
            document: root.join(DOCUMENT_FILE),
            state_dir,
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.state_dir.join("store")
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.state_dir.join("journal")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir.join("locks")
    }

    /// Fail if an edit session holds the store open
    ///
    /// sled takes an exclusive lock on its files, so one-shot commands
    /// cannot open the store while `sp edit` runs.
    pub fn ensure_no_session(&self) -> Result<()> {
        if let Some(holder) = SessionLock::holder(&self.state_dir)? {
            anyhow::bail!(
                "An edit session is active (pid {}). Use its prompt or stop it first.",
                holder.pid
            );
        }
        Ok(())
    }
}

/// Find workspace root by walking up from cwd to find .sp/
pub fn find_workspace_root() -> Result<PathBuf> {
    let current = std::env::current_dir().context("Failed to get current directory")?;
    find_workspace_root_from(&current)
}

pub fn find_workspace_root_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let state_dir = current.join(STATE_DIR);
        if state_dir.is_dir() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => anyhow::bail!("Not a Savepoint workspace (no .sp directory found)"),
        }
    }
}

/// Locate the workspace the command runs in
pub fn workspace_paths() -> Result<WorkspacePaths> {
    let root = find_workspace_root()?;
    Ok(WorkspacePaths::new(&root))
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let datetime = UNIX_EPOCH + Duration::from_millis(ts_ms);

    if let Ok(elapsed) = SystemTime::now().duration_since(datetime) {
        let seconds = elapsed.as_secs();

        if seconds < 60 {
            format!("{} seconds ago", seconds)
        } else if seconds < 3600 {
            format!("{} minutes ago", seconds / 60)
        } else if seconds < 86400 {
            format!("{} hours ago", seconds / 3600)
        } else if seconds < 604800 {
            format!("{} days ago", seconds / 86400)
        } else {
            format!("{} weeks ago", seconds / 604800)
        }
    } else {
        "in the future".to_string()
    }
}

/// Format timestamp as absolute UTC time ("2024-01-03 14:30:00")
pub fn format_absolute_time(ts_ms: u64) -> String {
    let secs = ts_ms / 1000;
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    // Civil-from-days, http://howardhinnant.github.io/date_algorithms.html
    let epoch_days = days + 719468;
    let era = epoch_days / 146097;
    let doe = epoch_days - era * 146097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, m, d, hours, minutes, seconds
    )
}

/// Time of day only ("14:30:00"), for session status lines
pub fn format_clock_time(ts_ms: u64) -> String {
    let absolute = format_absolute_time(ts_ms);
    absolute[11..].to_string()
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Display a snapshot in one line
pub fn display_snapshot_compact(snap: &Snapshot) {
    let time_str = format_relative_time(snap.ts_unix_ms);
    let label = snap
        .label
        .as_deref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    println!(
        "{} {} {}{} - {}/9 blocks",
        snap.short_id().yellow(),
        time_str.dimmed(),
        snap.reason.as_str().cyan(),
        label.green(),
        snap.document.filled_blocks()
    );
}

/// Load the workspace document from disk
pub fn load_document(paths: &WorkspacePaths) -> Result<WorkspaceDocument> {
    WorkspaceDocument::load(&paths.document)
}

/// Ask a yes/no question on stdin
pub fn confirm(prompt: &str) -> Result<bool> {
    use std::io::{BufRead, Write};

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Calculate directory size recursively
pub fn calculate_dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut total = 0u64;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            total += entry.metadata()?.len();
        } else if path.is_dir() {
            total += calculate_dir_size(&path)?;
        }
    }

    Ok(total)
}
