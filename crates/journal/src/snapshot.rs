//! Snapshot data structures

use crate::document::{WorkspaceDocument, WorkspaceId};
use crate::hash::ContentHash;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A versioned copy of a workspace at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique ID (ULID for timestamp + uniqueness)
    pub id: Ulid,
    /// Workspace this snapshot belongs to
    pub workspace: WorkspaceId,
    /// Previous snapshot of the same workspace
    pub parent: Option<Ulid>,
    /// Timestamp (Unix milliseconds)
    pub ts_unix_ms: u64,
    /// Reason for the snapshot
    pub reason: SnapshotReason,
    /// Optional human name ("pitch-v2")
    pub label: Option<String>,
    pub content_hash: ContentHash,
    pub document: WorkspaceDocument,
}

/// Reason for creating a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotReason {
    /// Periodic snapshot taken by an editing session
    Autosave,
    /// Explicit user request
    Manual,
    /// Taken when an older snapshot was restored
    Restore,
    /// Taken when the workspace was published
    Publish,
}

impl SnapshotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotReason::Autosave => "autosave",
            SnapshotReason::Manual => "manual",
            SnapshotReason::Restore => "restore",
            SnapshotReason::Publish => "publish",
        }
    }
}

impl Snapshot {
    /// Create a new snapshot of `document`
    pub fn new(
        parent: Option<Ulid>,
        document: WorkspaceDocument,
        reason: SnapshotReason,
        label: Option<String>,
    ) -> Self {
        let id = Ulid::new();
        Self {
            id,
            workspace: document.id,
            parent,
            ts_unix_ms: id.timestamp_ms(),
            reason,
            label,
            content_hash: document.content_hash(),
            document,
        }
    }

    /// First 8 characters of the ID
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("Failed to encode snapshot")
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context("Failed to decode snapshot")
    }
}
