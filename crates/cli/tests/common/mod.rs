//! Common utilities for integration tests

pub mod cli;

use anyhow::Result;
use journal::{CanvasBlock, WorkspaceDocument};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with its own config file location
pub struct TestWorkspace {
    dir: TempDir,
    config_path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("config/config.toml");
        Ok(Self { dir, config_path })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn document_path(&self) -> PathBuf {
        self.root().join("workspace.json")
    }

    /// Write a config file for commands run in this workspace
    pub fn write_config(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, contents)?;
        Ok(())
    }

    pub fn document(&self) -> Result<WorkspaceDocument> {
        WorkspaceDocument::load(&self.document_path())
    }

    /// Change one canvas block on disk, the way an editor would
    pub fn edit_block(&self, block: CanvasBlock, text: &str) -> Result<WorkspaceDocument> {
        let mut doc = self.document()?;
        doc.canvas.insert(block, text.to_string());
        doc.save(&self.document_path())?;
        Ok(doc)
    }

    pub fn sp(&self, args: &[&str]) -> cli::SpCommand {
        let mut cmd = cli::SpCommand::new(self.root(), &self.config_path);
        cmd.args(args);
        cmd
    }
}
