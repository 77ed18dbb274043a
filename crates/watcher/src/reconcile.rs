//! Periodic reconciliation scanner
//!
//! Periodically checks the document's mtime for changes that may have been
//! missed by the file watcher (dropped events, network filesystems, etc.)

use crate::{EditKind, EditSignal};
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periodic reconciliation scanner for one document
pub struct PeriodicReconciler {
    /// Document being reconciled
    path: PathBuf,

    /// Scan interval
    interval: Duration,

    /// mtime seen at the last scan (None if the file was missing)
    last_seen: Option<SystemTime>,

    /// Sender for detected changes
    change_tx: mpsc::Sender<EditSignal>,
}

impl PeriodicReconciler {
    /// Create new periodic reconciler, taking the current mtime as the baseline
    pub fn new(path: PathBuf, interval: Duration, change_tx: mpsc::Sender<EditSignal>) -> Self {
        let last_seen = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self {
            path,
            interval,
            last_seen,
            change_tx,
        }
    }

    /// Run periodic reconciliation loop until the receiver is dropped
    pub async fn run(mut self) -> Result<()> {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting periodic reconciliation of {} (interval: {:?})",
            self.path.display(),
            self.interval
        );

        loop {
            timer.tick().await;

            match self.check().await? {
                Some(signal) => {
                    debug!("Reconciliation found a missed change to {}", self.path.display());
                    if self.change_tx.send(signal).await.is_err() {
                        debug!("Reconciler receiver dropped, stopping");
                        return Ok(());
                    }
                }
                None => {
                    if self.change_tx.is_closed() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Compare the document's mtime with the last one seen
    pub async fn check(&mut self) -> Result<Option<EditSignal>> {
        let mtime = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Some(
                metadata
                    .modified()
                    .with_context(|| format!("No mtime for {}", self.path.display()))?,
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", self.path.display()))
            }
        };

        let changed = mtime != self.last_seen && mtime.is_some();
        self.last_seen = mtime;

        Ok(changed.then(|| EditSignal::new(self.path.clone(), EditKind::Reconciled)))
    }
}
