//! Workspace documents, their store, and the snapshot journal
//!
//! This crate provides:
//! - The workspace document model (business-model canvas + evidence)
//! - A sled-backed document store with an authoritative save clock
//! - An append-only journal of versioned snapshots (ULID-based IDs)
//! - Retention policies & GC for snapshots

pub mod document;
pub mod hash;
pub mod journal;
pub mod retention;
pub mod snapshot;
pub mod store;

// Re-exports
pub use document::{CanvasBlock, EvidenceKind, EvidenceRef, WorkspaceDocument, WorkspaceId};
pub use hash::ContentHash;
pub use journal::{IndexEntry, Journal, Recorded, MIN_PREFIX_LEN};
pub use retention::{GarbageCollector, GcMetrics, RetentionPolicy};
pub use snapshot::{Snapshot, SnapshotReason};
pub use store::{DocumentStore, StoreError, StoredDocument};

/// Result type for journal operations
pub type Result<T> = anyhow::Result<T>;
