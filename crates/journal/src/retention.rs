//! Retention policies and garbage collection

use crate::document::WorkspaceId;
use crate::journal::{IndexEntry, Journal};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use tracing::info;
use ulid::Ulid;

/// Retention policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Newest snapshots kept per workspace (default: 200)
    pub retain_count: usize,
    /// Snapshots younger than this are kept (default: 7 days, 0 disables)
    pub retain_window_ms: u64,
    /// Always retain labeled snapshots
    pub retain_labeled: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retain_count: 200,
            retain_window_ms: 7 * 24 * 60 * 60 * 1000, // 7 days
            retain_labeled: true,
        }
    }
}

/// What a collection pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcMetrics {
    pub snapshots_before: usize,
    pub snapshots_deleted: usize,
    pub snapshots_after: usize,
}

/// Garbage collector
pub struct GarbageCollector {
    policy: RetentionPolicy,
}

impl GarbageCollector {
    /// Create a new GC with the given policy
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Decide which snapshots to delete
    ///
    /// `entries` must be in append order. A snapshot survives if any rule keeps it.
    pub fn plan(&self, entries: &[(Ulid, IndexEntry)], now_ms: u64) -> Vec<Ulid> {
        let mut live: HashSet<Ulid> = HashSet::new();

        // Newest N per workspace
        let mut per_workspace: HashMap<WorkspaceId, Vec<Ulid>> = HashMap::new();
        for (id, entry) in entries {
            per_workspace.entry(entry.workspace).or_default().push(*id);
        }
        for ids in per_workspace.values() {
            live.extend(ids.iter().rev().take(self.policy.retain_count));
        }

        for (id, entry) in entries {
            let in_window = self.policy.retain_window_ms > 0
                && entry.ts_unix_ms.saturating_add(self.policy.retain_window_ms) > now_ms;
            let labeled = self.policy.retain_labeled && entry.label.is_some();
            if in_window || labeled {
                live.insert(*id);
            }
        }

        entries
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !live.contains(id))
            .collect()
    }

    /// Run garbage collection against a journal
    pub fn collect(&self, journal: &Journal, now_ms: u64) -> Result<GcMetrics> {
        let entries = journal.entries();
        let snapshots_before = entries.len();

        let doomed = self.plan(&entries, now_ms);
        let mut snapshots_deleted = 0;
        for id in &doomed {
            if journal.delete(id)? {
                snapshots_deleted += 1;
            }
        }
        journal.flush()?;

        info!(
            "GC deleted {} of {} snapshots",
            snapshots_deleted, snapshots_before
        );

        Ok(GcMetrics {
            snapshots_before,
            snapshots_deleted,
            snapshots_after: journal.count(),
        })
    }
}
