//! Document watching for Savepoint
//!
//! This crate turns changes to the on-disk workspace document into edit
//! signals for the autosave coordinator:
//! - A notify-based watcher on the document's parent directory, filtered to
//!   the document's file name so atomic-rename saves are seen
//! - A periodic mtime reconciler that catches anything the watcher missed

pub mod reconcile;

pub use reconcile::PeriodicReconciler;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors raised while setting up a watch
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("{0} does not name a file")]
    NoFileName(PathBuf),

    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// A change to the watched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSignal {
    /// Path of the document
    pub path: PathBuf,
    /// Type of change
    pub kind: EditKind,
    /// When the change was observed
    pub at: SystemTime,
}

impl EditSignal {
    pub fn new(path: PathBuf, kind: EditKind) -> Self {
        Self {
            path,
            kind,
            at: SystemTime::now(),
        }
    }
}

/// Type of document change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Document created (including renamed into place)
    Created,
    /// Document contents or metadata changed
    Modified,
    /// Document removed or renamed away
    Removed,
    /// Change found by the periodic reconciler
    Reconciled,
}

/// Watches a single document file
///
/// Dropping the watcher stops it.
pub struct DocumentWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DocumentWatcher {
    /// Start watching `path`, sending signals on `tx`
    ///
    /// The channel is never awaited from the notify thread: when it is full
    /// the signal is dropped, since a queued signal already implies an edit.
    pub fn watch(path: &Path, tx: mpsc::Sender<EditSignal>) -> Result<Self, WatchError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| WatchError::NoFileName(path.to_path_buf()))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let document = path.to_path_buf();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = classify(&event, &file_name) else {
                    return;
                };
                match tx.try_send(EditSignal::new(document.clone(), kind)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("Edit channel full, dropping {:?} signal", kind);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        };

        let mut watcher = notify::recommended_watcher(handler).map_err(|source| {
            WatchError::Notify {
                path: dir.clone(),
                source,
            }
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: dir.clone(),
                source,
            })?;

        debug!("Watching {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// Path of the watched document
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map a raw notify event to an edit of the file named `file_name`
pub fn classify(event: &Event, file_name: &OsStr) -> Option<EditKind> {
    use notify::EventKind as K;

    let names: Vec<OsString> = event
        .paths
        .iter()
        .filter_map(|p| p.file_name().map(OsStr::to_os_string))
        .collect();
    let position = names.iter().position(|name| name == file_name)?;

    match event.kind {
        K::Access(_) => None,
        K::Create(_) => Some(EditKind::Created),
        K::Remove(_) => Some(EditKind::Removed),
        K::Modify(ModifyKind::Name(RenameMode::From)) => Some(EditKind::Removed),
        K::Modify(ModifyKind::Name(RenameMode::To)) => Some(EditKind::Created),
        // `Both` lists [from, to]
        K::Modify(ModifyKind::Name(RenameMode::Both)) if position == 0 && names.len() > 1 => {
            Some(EditKind::Removed)
        }
        K::Modify(ModifyKind::Name(RenameMode::Both)) => Some(EditKind::Created),
        K::Modify(_) | K::Any | K::Other => Some(EditKind::Modified),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use notify::EventKind;
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    fn name() -> &'static OsStr {
        OsStr::new("workspace.json")
    }

    #[test]
    fn test_classify_filters_other_files() {
        let ev = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/ws/notes.txt"],
        );
        assert_eq!(classify(&ev, name()), None);
    }

    #[test]
    fn test_classify_basic_kinds() {
        let modify = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/ws/workspace.json"],
        );
        assert_eq!(classify(&modify, name()), Some(EditKind::Modified));

        let create = event(EventKind::Create(CreateKind::File), &["/ws/workspace.json"]);
        assert_eq!(classify(&create, name()), Some(EditKind::Created));

        let remove = event(EventKind::Remove(RemoveKind::File), &["/ws/workspace.json"]);
        assert_eq!(classify(&remove, name()), Some(EditKind::Removed));

        let access = event(EventKind::Access(AccessKind::Any), &["/ws/workspace.json"]);
        assert_eq!(classify(&access, name()), None);
    }

    #[test]
    fn test_classify_atomic_rename() {
        // Editor writes a temp file then renames it over the document
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/ws/workspace.json.tmp", "/ws/workspace.json"],
        );
        assert_eq!(classify(&both, name()), Some(EditKind::Created));

        let to = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/ws/workspace.json"],
        );
        assert_eq!(classify(&to, name()), Some(EditKind::Created));

        let away = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/ws/workspace.json", "/ws/old.json"],
        );
        assert_eq!(classify(&away, name()), Some(EditKind::Removed));
    }

    #[test]
    fn test_watch_rejects_directory_like_paths() {
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(
            DocumentWatcher::watch(Path::new("/"), tx),
            Err(WatchError::NoFileName(_))
        ));
    }

    #[tokio::test]
    async fn test_watcher_sees_writes() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("workspace.json");
        std::fs::write(&path, b"{}")?;

        let (tx, mut rx) = mpsc::channel(64);
        let watcher = DocumentWatcher::watch(&path, tx)?;
        assert_eq!(watcher.path(), path);

        // Unrelated files are filtered out
        std::fs::write(temp_dir.path().join("other.json"), b"{}")?;
        std::fs::write(&path, b"{\"title\":\"x\"}")?;

        let signal = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await?
            .expect("watcher channel closed");
        assert_eq!(signal.path, path);
        assert_ne!(signal.kind, EditKind::Reconciled);
        Ok(())
    }
}
