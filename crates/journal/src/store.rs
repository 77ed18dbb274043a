//! Document store for workspace heads
//!
//! The store is the authoritative end of a save: every `put` is stamped by the
//! store's own clock, which never goes backwards and never repeats, so the
//! timestamp handed back to the autosave coordinator can be trusted for
//! ordering even if the wall clock jumps.

use crate::document::{WorkspaceDocument, WorkspaceId};
use crate::hash::ContentHash;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

const CLOCK_KEY: &[u8] = b"clock";

/// Store-specific failures callers may want to match on
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workspace {0} not found in store")]
    NotFound(WorkspaceId),

    #[error("stored record for workspace {0} is corrupt")]
    Corrupt(WorkspaceId),
}

/// The current head of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub document: WorkspaceDocument,
    /// Bumped whenever the content changes
    pub revision: u64,
    /// Store clock at the last write (Unix milliseconds)
    pub saved_at_ms: u64,
    pub content_hash: ContentHash,
}

/// sled-backed store holding the latest version of each workspace
pub struct DocumentStore {
    db: Db,
    heads: Tree,
    meta: Tree,
    /// Last issued save timestamp; also serializes writers
    clock: Mutex<u64>,
}

impl DocumentStore {
    /// Open or create a store at the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("documents.db"))
            .with_context(|| format!("Failed to open document store at {}", path.display()))?;
        let heads = db.open_tree("heads")?;
        let meta = db.open_tree("meta")?;

        let last = match meta.get(CLOCK_KEY)? {
            Some(bytes) => u64::from_le_bytes(
                bytes
                    .as_ref()
                    .try_into()
                    .context("Corrupt store clock")?,
            ),
            None => 0,
        };

        Ok(Self {
            db,
            heads,
            meta,
            clock: Mutex::new(last),
        })
    }

    /// Write a workspace head and return its stored record
    ///
    /// Writing unchanged content still counts as a save: it gets a fresh
    /// timestamp but keeps its revision.
    pub fn put(&self, document: &WorkspaceDocument) -> Result<StoredDocument> {
        let mut clock = self.clock.lock();
        let record = self.stage(&mut clock, document)?;

        // Flush to ensure durability before reporting the save
        self.db.flush()?;

        debug!(
            workspace = %document.id,
            revision = record.revision,
            saved_at_ms = record.saved_at_ms,
            "stored workspace head"
        );
        Ok(record)
    }

    /// Write a head and its timestamp without flushing
    ///
    /// The clock advances as soon as the timestamp is written, so a failed
    /// flush cannot make the next save reuse it.
    fn stage(&self, clock: &mut u64, document: &WorkspaceDocument) -> Result<StoredDocument> {
        let content_hash = document.content_hash();
        let previous = self.get(&document.id)?;
        let revision = match &previous {
            Some(prev) if prev.content_hash == content_hash => prev.revision,
            Some(prev) => prev.revision + 1,
            None => 1,
        };

        let saved_at_ms = now_ms().max(*clock + 1);
        let record = StoredDocument {
            document: document.clone(),
            revision,
            saved_at_ms,
            content_hash,
        };

        let value = bincode::serialize(&record).context("Failed to encode stored workspace")?;
        self.heads.insert(document.id.to_bytes(), value)?;
        self.meta.insert(CLOCK_KEY, saved_at_ms.to_le_bytes().to_vec())?;
        *clock = saved_at_ms;

        Ok(record)
    }

    /// Get the head of a workspace, if stored
    pub fn get(&self, id: &WorkspaceId) -> Result<Option<StoredDocument>> {
        match self.heads.get(id.to_bytes())? {
            Some(value) => {
                let record = bincode::deserialize(&value).map_err(|_| StoreError::Corrupt(*id))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Get the head of a workspace, failing with [`StoreError::NotFound`]
    pub fn head(&self, id: &WorkspaceId) -> Result<StoredDocument> {
        self.get(id)?.ok_or_else(|| StoreError::NotFound(*id).into())
    }

    /// All stored heads
    pub fn list(&self) -> Result<Vec<StoredDocument>> {
        let mut records = Vec::new();
        for item in self.heads.iter() {
            let (key, value) = item?;
            let id = WorkspaceId::from_bytes(key.as_ref().try_into().context("Corrupt store key")?);
            let record = bincode::deserialize(&value).map_err(|_| StoreError::Corrupt(id))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Remove a workspace head. Returns false if it was not stored.
    pub fn remove(&self, id: &WorkspaceId) -> Result<bool> {
        let removed = self.heads.remove(id.to_bytes())?.is_some();
        self.db.flush()?;
        Ok(removed)
    }

    /// Last timestamp issued by this store
    pub fn last_saved_ms(&self) -> u64 {
        *self.clock.lock()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
