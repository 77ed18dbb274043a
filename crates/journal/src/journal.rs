//! Append-only snapshot journal using sled

use crate::document::{WorkspaceDocument, WorkspaceId};
use crate::snapshot::{Snapshot, SnapshotReason};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use ulid::Ulid;

/// Minimum length of an ID prefix accepted by [`Journal::resolve`]
pub const MIN_PREFIX_LEN: usize = 4;

/// What the journal keeps in memory about each snapshot
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub seq: u64,
    pub workspace: WorkspaceId,
    pub ts_unix_ms: u64,
    pub label: Option<String>,
}

/// Outcome of [`Journal::record`]
#[derive(Debug, Clone)]
pub enum Recorded {
    /// A new snapshot was appended
    Created(Snapshot),
    /// Content matched the latest snapshot; nothing was written
    Unchanged(Snapshot),
}

impl Recorded {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Recorded::Created(snap) | Recorded::Unchanged(snap) => snap,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Recorded::Created(_))
    }
}

/// Append-only journal for snapshots
pub struct Journal {
    /// Sled database
    db: Db,
    /// In-memory index: snapshot_id -> entry
    index: RwLock<BTreeMap<Ulid, IndexEntry>>,
    /// Monotonic sequence counter
    seq_counter: AtomicU64,
}

impl Journal {
    /// Open or create a journal at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("snapshots.db"))
            .with_context(|| format!("Failed to open snapshot journal at {}", path.display()))?;

        // Build in-memory index on startup
        let mut index = BTreeMap::new();
        let mut max_seq = 0u64;

        for item in db.iter() {
            let (key, value) = item?;
            let seq = u64::from_be_bytes(key.as_ref().try_into().context("Corrupt journal key")?);
            let snapshot = Snapshot::deserialize(&value)
                .with_context(|| format!("Corrupt snapshot at sequence {}", seq))?;
            index.insert(snapshot.id, Self::entry_for(seq, &snapshot));
            max_seq = max_seq.max(seq);
        }

        debug!("Opened journal with {} snapshots", index.len());

        Ok(Self {
            db,
            index: RwLock::new(index),
            seq_counter: AtomicU64::new(max_seq + 1),
        })
    }

    fn entry_for(seq: u64, snapshot: &Snapshot) -> IndexEntry {
        IndexEntry {
            seq,
            workspace: snapshot.workspace,
            ts_unix_ms: snapshot.ts_unix_ms,
            label: snapshot.label.clone(),
        }
    }

    /// Append a snapshot to the journal
    pub fn append(&self, snapshot: &Snapshot) -> Result<u64> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        // Big-endian keys keep sled's iteration order equal to append order
        let key = seq.to_be_bytes();
        let value = snapshot.serialize()?;

        self.db.insert(key, value)?;

        // Update index
        self.index
            .write()
            .insert(snapshot.id, Self::entry_for(seq, snapshot));

        // Flush to ensure durability
        self.db.flush()?;

        Ok(seq)
    }

    /// Snapshot `document` unless it matches the workspace's latest snapshot
    ///
    /// A label always forces a new snapshot, so a named version exists even
    /// when the content has not moved since the last one.
    pub fn record(
        &self,
        document: &WorkspaceDocument,
        reason: SnapshotReason,
        label: Option<String>,
    ) -> Result<Recorded> {
        if let Some(label) = &label {
            if self.find_by_label(label)?.is_some() {
                anyhow::bail!("Label '{}' is already used by another snapshot", label);
            }
        }

        let latest = self.latest(&document.id)?;
        if let Some(latest) = &latest {
            if label.is_none() && latest.content_hash == document.content_hash() {
                debug!("Skipping snapshot of {}: content unchanged", document.id);
                return Ok(Recorded::Unchanged(latest.clone()));
            }
        }

        let snapshot = Snapshot::new(
            latest.map(|snap| snap.id),
            document.clone(),
            reason,
            label,
        );
        self.append(&snapshot)?;
        debug!(
            "Recorded {} snapshot {} of {}",
            reason.as_str(),
            snapshot.short_id(),
            document.id
        );
        Ok(Recorded::Created(snapshot))
    }

    /// Get a snapshot by ID
    pub fn get(&self, id: &Ulid) -> Result<Option<Snapshot>> {
        let seq = match self.index.read().get(id) {
            Some(entry) => entry.seq,
            None => return Ok(None),
        };
        self.load(seq)
    }

    fn load(&self, seq: u64) -> Result<Option<Snapshot>> {
        match self.db.get(seq.to_be_bytes())? {
            Some(value) => Ok(Some(Snapshot::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self, seqs: &[u64]) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::with_capacity(seqs.len());
        for &seq in seqs {
            if let Some(snapshot) = self.load(seq)? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    /// Sequence numbers in append order, optionally limited to one workspace
    fn seqs_for(&self, workspace: Option<&WorkspaceId>) -> Vec<u64> {
        let index = self.index.read();
        let mut seqs: Vec<_> = index
            .values()
            .filter(|entry| workspace.map_or(true, |ws| entry.workspace == *ws))
            .map(|entry| entry.seq)
            .collect();
        seqs.sort_unstable();
        seqs
    }

    /// Get the latest snapshot of a workspace
    pub fn latest(&self, workspace: &WorkspaceId) -> Result<Option<Snapshot>> {
        match self.seqs_for(Some(workspace)).last() {
            Some(&seq) => self.load(seq),
            None => Ok(None),
        }
    }

    /// Get the last N snapshots of a workspace, oldest first
    pub fn last_n(&self, workspace: &WorkspaceId, count: usize) -> Result<Vec<Snapshot>> {
        let seqs = self.seqs_for(Some(workspace));
        let start_idx = seqs.len().saturating_sub(count);
        self.load_all(&seqs[start_idx..])
    }

    /// Get snapshots taken at or after a timestamp, oldest first
    pub fn since(&self, timestamp_ms: u64) -> Result<Vec<Snapshot>> {
        let seqs: Vec<u64> = {
            let index = self.index.read();
            let mut seqs: Vec<_> = index
                .values()
                .filter(|entry| entry.ts_unix_ms >= timestamp_ms)
                .map(|entry| entry.seq)
                .collect();
            seqs.sort_unstable();
            seqs
        };
        self.load_all(&seqs)
    }

    /// Get the snapshot carrying `label`
    pub fn find_by_label(&self, label: &str) -> Result<Option<Snapshot>> {
        let seq = self
            .index
            .read()
            .values()
            .find(|entry| entry.label.as_deref() == Some(label))
            .map(|entry| entry.seq);

        match seq {
            Some(seq) => self.load(seq),
            None => Ok(None),
        }
    }

    /// Resolve a reference: full ULID, unique ULID prefix, or label
    pub fn resolve(&self, reference: &str) -> Result<Snapshot> {
        if let Ok(id) = Ulid::from_string(reference) {
            if let Some(snapshot) = self.get(&id)? {
                return Ok(snapshot);
            }
        }

        if reference.len() >= MIN_PREFIX_LEN {
            let prefix = reference.to_ascii_uppercase();
            let matches: Vec<Ulid> = self
                .index
                .read()
                .keys()
                .filter(|id| id.to_string().starts_with(&prefix))
                .copied()
                .collect();

            match matches.len() {
                0 => {}
                1 => {
                    if let Some(snapshot) = self.get(&matches[0])? {
                        return Ok(snapshot);
                    }
                }
                n => anyhow::bail!(
                    "Ambiguous snapshot reference '{}' matches {} snapshots",
                    reference,
                    n
                ),
            }
        }

        if let Some(snapshot) = self.find_by_label(reference)? {
            return Ok(snapshot);
        }

        anyhow::bail!("No snapshot found for '{}'", reference)
    }

    /// Index entries in append order
    pub fn entries(&self) -> Vec<(Ulid, IndexEntry)> {
        let mut entries: Vec<_> = self
            .index
            .read()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
    }

    /// Get all snapshots of a workspace, oldest first
    pub fn list(&self, workspace: &WorkspaceId) -> Result<Vec<Snapshot>> {
        self.load_all(&self.seqs_for(Some(workspace)))
    }

    /// Delete a snapshot. Returns false if it did not exist.
    pub fn delete(&self, id: &Ulid) -> Result<bool> {
        let seq = match self.index.write().remove(id) {
            Some(entry) => entry.seq,
            None => return Ok(false),
        };

        self.db.remove(seq.to_be_bytes())?;
        Ok(true)
    }

    /// Flush pending deletes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the total number of snapshots
    pub fn count(&self) -> usize {
        self.index.read().len()
    }
}
