//! Start an autosaving edit session

use anyhow::{Context, Result};
use cli_lib::{config, session, util};
use std::time::Duration;

pub async fn run(debounce_ms: Option<u64>) -> Result<()> {
    let paths = util::workspace_paths().context("Failed to find workspace")?;
    let system = config::load()?;

    let mut autosave = system.autosave_config();
    if let Some(ms) = debounce_ms {
        autosave = autosave.with_debounce(Duration::from_millis(ms));
    }

    session::run(paths, autosave, system.snapshots.autosnapshot_every).await
}
