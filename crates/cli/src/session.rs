//! Interactive edit session
//!
//! The session owns one autosave coordinator for the workspace document being
//! edited. Watcher signals become `perform_save` calls; the prompt and Ctrl-C
//! use `save_now`. If `workspace.json` is swapped for a document with another
//! identity, the coordinator is torn down and a fresh one takes over.

use crate::locks::SessionLock;
use crate::util::{self, WorkspacePaths};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use coordinator::{
    AutosaveCoordinator, ErrorInfo, Phase, SaveObserver, SaveState, SaveStatus, SaveTask,
    Timestamp,
};
use journal::{
    DocumentStore, Journal, Recorded, SnapshotReason, WorkspaceDocument, WorkspaceId,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use watcher::{DocumentWatcher, EditKind, PeriodicReconciler};

/// How often the reconciler re-checks the document's mtime
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(5);

/// Everything a save attempt needs; shared by every attempt of a session
pub struct SaveContext {
    store: Arc<DocumentStore>,
    journal: Arc<Journal>,
    document_path: PathBuf,
    workspace: WorkspaceId,
    autosnapshot_every: u64,
    saves: AtomicU64,
}

impl SaveContext {
    pub fn new(
        workspace: &Workspace,
        id: WorkspaceId,
        autosnapshot_every: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            store: workspace.store.clone(),
            journal: workspace.journal.clone(),
            document_path: workspace.paths.document.clone(),
            workspace: id,
            autosnapshot_every,
            saves: AtomicU64::new(0),
        })
    }

    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    /// Read the document from disk and write it to the store (blocking)
    pub fn write_head(&self) -> Result<Timestamp> {
        let document = WorkspaceDocument::load(&self.document_path)?;
        if document.id != self.workspace {
            anyhow::bail!(
                "workspace identity changed ({} -> {})",
                self.workspace,
                document.id
            );
        }

        let record = self.store.put(&document)?;

        let saves = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.autosnapshot_every > 0 && saves % self.autosnapshot_every == 0 {
            // A failed snapshot does not fail the save; the head is already durable
            if let Err(e) = self.journal.record(&document, SnapshotReason::Autosave, None) {
                warn!("Autosnapshot failed: {:#}", e);
            }
        }

        Ok(Timestamp::from_unix_ms(record.saved_at_ms))
    }

    /// Save task re-running [`write_head`](Self::write_head) off the async runtime
    pub fn task(self: &Arc<Self>) -> SaveTask {
        let context = Arc::clone(self);
        SaveTask::new(move || {
            let context = Arc::clone(&context);
            async move {
                tokio::task::spawn_blocking(move || context.write_head())
                    .await
                    .context("Save attempt aborted")?
            }
        })
    }
}

/// Logs save outcomes and keeps counters for the session summary
#[derive(Debug, Default)]
pub struct SessionObserver {
    saves: AtomicU64,
    failures: AtomicU64,
}

impl SessionObserver {
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

impl SaveObserver for SessionObserver {
    fn on_success(&self, saved_at: Timestamp) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        info!("Saved workspace at {}", saved_at);
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        warn!(
            "Save failed after {} attempts: {}",
            error.attempts, error.message
        );
    }
}

/// A line typed at the session prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Save,
    Snapshot(Option<String>),
    Discard,
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };

        let parsed = match command {
            "save" | "s" => SessionCommand::Save,
            "snapshot" | "snap" => SessionCommand::Snapshot(words.next().map(String::from)),
            "discard" => SessionCommand::Discard,
            "status" => SessionCommand::Status,
            "help" | "?" => SessionCommand::Help,
            "quit" | "q" | "exit" => SessionCommand::Quit,
            other => anyhow::bail!("Unknown command '{}'. Type 'help' for commands.", other),
        };
        Ok(Some(parsed))
    }
}

/// One line describing a save state
pub fn status_line(state: &SaveState) -> String {
    let status = state.status();
    match (&status, state.phase) {
        (_, Phase::Retrying) => format!(
            "{} retrying after {} failed attempt(s)",
            "↻".yellow(),
            state.retry_count
        ),
        (SaveStatus::Saving, _) => format!("{} {}", "…".cyan(), status),
        (SaveStatus::Failed(_), _) => format!("{} {}", "✗".red(), status.red()),
        (SaveStatus::Unsaved, _) => format!("{} {}", "●".yellow(), status),
        (SaveStatus::Saved(Some(ts)), _) => format!(
            "{} {} {}",
            "✓".green(),
            status,
            format!("({})", util::format_clock_time(ts.as_unix_ms())).dimmed()
        ),
        (SaveStatus::Saved(None), _) => format!("{} {}", "✓".green(), status),
    }
}

/// Print a status line whenever the visible status changes
fn spawn_status_printer(mut rx: watch::Receiver<SaveState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let line = status_line(&rx.borrow_and_update());
            if line != last {
                println!("{}", line);
                last = line;
            }
        }
    })
}

/// A running edit session
pub struct EditSession {
    workspace: Workspace,
    autosave: coordinator::AutosaveConfig,
    autosnapshot_every: u64,
    context: Arc<SaveContext>,
    coordinator: AutosaveCoordinator,
    observer: Arc<SessionObserver>,
    printer: Option<tokio::task::JoinHandle<()>>,
    _lock: SessionLock,
}

impl EditSession {
    /// Take the session lock and start a coordinator for `workspace.json`
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(
        paths: WorkspacePaths,
        autosave: coordinator::AutosaveConfig,
        autosnapshot_every: u64,
    ) -> Result<Self> {
        let lock = SessionLock::acquire(&paths.state_dir)?;
        let workspace = Workspace::open(paths)?;
        let document = workspace.load_document()?;

        let observer = Arc::new(SessionObserver::default());
        let context = SaveContext::new(&workspace, document.id, autosnapshot_every);
        let coordinator = AutosaveCoordinator::spawn(autosave.clone(), observer.clone())
            .context("Invalid autosave configuration")?;

        info!("Edit session started for workspace {}", document.id);

        Ok(Self {
            workspace,
            autosave,
            autosnapshot_every,
            context,
            coordinator,
            observer,
            printer: None,
            _lock: lock,
        })
    }

    /// Print status transitions to stdout
    pub fn print_status(&mut self) {
        if self.printer.is_none() {
            self.printer = Some(spawn_status_printer(self.coordinator.subscribe()));
        }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        self.context.workspace()
    }

    pub fn coordinator(&self) -> &AutosaveCoordinator {
        &self.coordinator
    }

    pub fn observer(&self) -> &SessionObserver {
        &self.observer
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// React to a change of `workspace.json`
    pub fn on_edit(&mut self) -> Result<()> {
        // An unparsable file is mid-edit; let the save fail and retry
        if let Ok(document) = self.workspace.load_document() {
            if document.id != self.context.workspace() {
                self.switch_document(document.id)?;
            }
        }

        self.coordinator.perform_save(self.context.task());
        Ok(())
    }

    /// Tear down the coordinator of the old document and start a new one
    fn switch_document(&mut self, id: WorkspaceId) -> Result<()> {
        warn!(
            "workspace.json now holds workspace {} (was {}); restarting autosave",
            id,
            self.context.workspace()
        );

        self.coordinator.clear_queue();
        self.coordinator.shutdown();

        self.context = SaveContext::new(&self.workspace, id, self.autosnapshot_every);
        self.coordinator =
            AutosaveCoordinator::spawn(self.autosave.clone(), self.observer.clone())
                .context("Invalid autosave configuration")?;

        if let Some(printer) = self.printer.take() {
            printer.abort();
            self.print_status();
        }
        Ok(())
    }

    /// Save right away, skipping the debounce window
    pub async fn save_now(&self) -> Result<Timestamp> {
        let saved_at = self.coordinator.save_now(self.context.task()).await?;
        Ok(saved_at)
    }

    /// Save, then snapshot the stored head
    pub async fn snapshot(&self, label: Option<String>) -> Result<Recorded> {
        self.save_now().await?;
        let head = self.workspace.store.head(&self.context.workspace())?;
        self.workspace
            .journal
            .record(&head.document, SnapshotReason::Manual, label)
    }

    /// Drop a scheduled save that has not started
    pub fn discard_pending(&self) {
        self.coordinator.cancel_pending();
    }

    /// Flush outstanding edits and stop the coordinator
    pub async fn finish(mut self) -> Result<()> {
        let flushed = self.save_now().await;
        self.coordinator.shutdown();
        if let Some(printer) = self.printer.take() {
            printer.abort();
        }

        info!(
            "Edit session ended: {} saves, {} failed cycles",
            self.observer.saves(),
            self.observer.failures()
        );

        flushed.map(|_| ())
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  save            save now");
    println!("  snapshot [NAME] save and record a snapshot");
    println!("  discard         drop the scheduled save");
    println!("  status          show save state");
    println!("  quit            save and exit (also Ctrl-C)");
}

/// Run an edit session until `quit` or Ctrl-C
pub async fn run(
    paths: WorkspacePaths,
    autosave: coordinator::AutosaveConfig,
    autosnapshot_every: u64,
) -> Result<()> {
    let document_path = paths.document.clone();
    let mut session = EditSession::open(paths, autosave, autosnapshot_every)?;
    session.print_status();

    let (edit_tx, mut edit_rx) = mpsc::channel(64);
    let _watcher = DocumentWatcher::watch(&document_path, edit_tx.clone())?;
    let reconciler = PeriodicReconciler::new(document_path.clone(), RECONCILE_INTERVAL, edit_tx);
    let reconcile_handle = tokio::spawn(reconciler.run());

    println!(
        "Editing {} ({}). Type 'help' for commands.",
        document_path.display().to_string().cyan(),
        session.workspace_id().to_string().dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                break;
            }
            Some(signal) = edit_rx.recv() => {
                if signal.kind == EditKind::Removed {
                    warn!("{} was removed; waiting for it to return", signal.path.display());
                    continue;
                }
                session.on_edit()?;
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                match SessionCommand::parse(&line) {
                    Ok(Some(SessionCommand::Quit)) => break,
                    Ok(Some(command)) => run_command(&session, command).await,
                    Ok(None) => {}
                    Err(e) => println!("{}", e.to_string().yellow()),
                }
            }
        }
    }

    reconcile_handle.abort();

    match session.finish().await {
        Ok(()) => {
            println!("{}", "Session closed, all changes saved".green());
            Ok(())
        }
        Err(e) => {
            println!("{} {:#}", "Final save failed:".red(), e);
            println!("{}", "Your edits are still in workspace.json".dimmed());
            Err(e)
        }
    }
}

async fn run_command(session: &EditSession, command: SessionCommand) {
    match command {
        SessionCommand::Save => match session.save_now().await {
            Ok(ts) => println!(
                "{} Saved at {}",
                "✓".green(),
                util::format_clock_time(ts.as_unix_ms())
            ),
            Err(e) => println!("{} {:#}", "✗".red(), e),
        },
        SessionCommand::Snapshot(label) => match session.snapshot(label).await {
            Ok(Recorded::Created(snap)) => {
                println!("{} Snapshot {}", "✓".green(), snap.id.to_string().yellow())
            }
            Ok(Recorded::Unchanged(snap)) => println!(
                "No changes since snapshot {}",
                snap.short_id().yellow()
            ),
            Err(e) => println!("{} {:#}", "✗".red(), e),
        },
        SessionCommand::Discard => {
            session.discard_pending();
            println!("Scheduled save dropped; edits stay in workspace.json");
        }
        SessionCommand::Status => {
            let state = session.coordinator().state();
            println!("{}", status_line(&state));
            if let Some(ts) = state.last_saved {
                println!(
                    "  Last saved: {}",
                    util::format_absolute_time(ts.as_unix_ms())
                );
            }
        }
        SessionCommand::Help => print_help(),
        SessionCommand::Quit => {}
    }
}
