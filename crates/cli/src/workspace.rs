//! An initialized workspace: its document, store, and journal

use crate::util::WorkspacePaths;
use anyhow::{Context, Result};
use journal::{
    DocumentStore, Journal, Recorded, SnapshotReason, StoredDocument, WorkspaceDocument,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Open handles on a workspace's storage
pub struct Workspace {
    pub paths: WorkspacePaths,
    pub store: Arc<DocumentStore>,
    pub journal: Arc<Journal>,
}

impl Workspace {
    /// Create `.sp/` under `root` and adopt or create `workspace.json`
    ///
    /// An existing `workspace.json` is kept as is; otherwise a blank one
    /// titled `title` is written. The first version is stored and snapshotted.
    pub fn init(root: &Path, title: &str) -> Result<(Self, WorkspaceDocument)> {
        let paths = WorkspacePaths::new(root);
        if paths.state_dir.exists() {
            anyhow::bail!(
                "Savepoint workspace already initialized at {}",
                paths.state_dir.display()
            );
        }

        let document = if paths.document.exists() {
            WorkspaceDocument::load(&paths.document)?
        } else {
            let document = WorkspaceDocument::new(title);
            document.save(&paths.document)?;
            document
        };

        for dir in [
            paths.store_dir(),
            paths.journal_dir(),
            paths.logs_dir(),
            paths.locks_dir(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let workspace = Self::open(paths)?;
        workspace.store.put(&document)?;
        workspace
            .journal
            .record(&document, SnapshotReason::Manual, None)?;

        info!("Initialized workspace {} at {}", document.id, root.display());
        Ok((workspace, document))
    }

    /// Open the store and journal of an initialized workspace
    pub fn open(paths: WorkspacePaths) -> Result<Self> {
        let store = DocumentStore::open(&paths.store_dir()).context("Failed to open document store")?;
        let journal = Journal::open(&paths.journal_dir()).context("Failed to open snapshot journal")?;
        Ok(Self {
            paths,
            store: Arc::new(store),
            journal: Arc::new(journal),
        })
    }

    /// Load `workspace.json` from disk
    pub fn load_document(&self) -> Result<WorkspaceDocument> {
        WorkspaceDocument::load(&self.paths.document)
    }

    /// Stored head of the on-disk document's workspace
    pub fn head(&self) -> Result<Option<StoredDocument>> {
        let document = self.load_document()?;
        self.store.get(&document.id)
    }

    /// Put `document` back on disk and into the store, keeping the replaced
    /// version as a restore snapshot
    pub fn restore(&self, document: &WorkspaceDocument) -> Result<Recorded> {
        let safety = match self.load_document() {
            Ok(current) => Some(self.journal.record(&current, SnapshotReason::Restore, None)?),
            Err(_) => None,
        };

        document.save(&self.paths.document)?;
        self.store.put(document)?;
        let restored = self.journal.record(document, SnapshotReason::Restore, None)?;

        Ok(safety.unwrap_or(restored))
    }
}
