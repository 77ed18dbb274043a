//! Autosave coordinator
//!
//! Handles and the worker task share one [`Core`] behind a mutex. Handle calls
//! mutate it synchronously, so [`AutosaveCoordinator::state`] reflects them as
//! soon as they return. The worker owns the clock: it reacts to debounce,
//! backoff and timeout deadlines and to finished attempts.
//!
//! Every attempt runs as its own tokio task and always runs to completion. An
//! attempt that timed out or was detached by `clear_queue` becomes the
//! straggler; its result is dropped, and no attempt starts until it has ended.

use crate::config::AutosaveConfig;
use crate::error::{AttemptError, ConfigError, ErrorInfo, SaveError};
use crate::observer::SaveObserver;
use crate::state::{Event, SaveState};
use crate::task::{SaveTask, Timestamp};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

type Responder = oneshot::Sender<Result<Timestamp, SaveError>>;

/// Sent by an attempt task when it ends
struct Finished {
    id: u64,
    result: Result<Timestamp, AttemptError>,
}

/// Observer call made once the core lock is released
enum Outcome {
    Saved(Timestamp),
    Failed(ErrorInfo),
}

struct Shared {
    core: Mutex<Core>,
    /// Deadlines changed; the worker recomputes its timer
    wake: Notify,
    shutdown: CancellationToken,
}

/// Handle to a running autosave coordinator
///
/// Clones share one worker. The worker stops on [`shutdown`](Self::shutdown)
/// or once every handle is dropped; after that all calls are no-ops.
#[derive(Clone)]
pub struct AutosaveCoordinator {
    shared: Arc<Shared>,
    state: watch::Receiver<SaveState>,
    _alive: Arc<DropGuard>,
}

impl AutosaveCoordinator {
    /// Spawn a coordinator worker on the current tokio runtime
    pub fn spawn(
        config: AutosaveConfig,
        observer: Arc<dyn SaveObserver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        debug!(
            debounce_ms = config.debounce.as_millis() as u64,
            max_retries = config.max_retries,
            "starting autosave worker"
        );

        let (state_tx, state_rx) = watch::channel(SaveState::default());
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let shared = Arc::new(Shared {
            core: Mutex::new(Core::new(config, state_tx, done_tx, Handle::current())),
            wake: Notify::new(),
            shutdown: shutdown.clone(),
        });

        let worker = Worker {
            shared: shared.clone(),
            observer,
            finished: done_rx,
        };
        tokio::spawn(worker.run());

        Ok(Self {
            shared,
            state: state_rx,
            _alive: Arc::new(shutdown.drop_guard()),
        })
    }

    /// Record an edit and schedule a debounced save with `task`
    ///
    /// Each call restarts the debounce window; only the last task of a burst runs.
    pub fn perform_save(&self, task: SaveTask) {
        self.with_core(|core| core.schedule(task));
    }

    /// Save without waiting for the debounce window
    ///
    /// Supersedes any pending debounced save. If a save is in flight, this one
    /// runs as soon as it resolves.
    pub async fn save_now(&self, task: SaveTask) -> Result<Timestamp, SaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.with_core(|core| core.save_now(task, reply_tx)).is_none() {
            return Err(SaveError::Closed);
        }

        reply_rx.await.unwrap_or(Err(SaveError::Closed))
    }

    /// Cancel a debounce timer that has not fired yet
    pub fn cancel_pending(&self) {
        self.with_core(Core::cancel_pending);
    }

    /// Drop all queued work and detach any in-flight save
    ///
    /// The detached save's I/O is allowed to finish but its result is ignored.
    pub fn clear_queue(&self) {
        self.with_core(Core::clear_queue);
    }

    /// Snapshot of the current save state
    pub fn state(&self) -> SaveState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.clone()
    }

    /// Tear down the worker. Pending work is discarded and in-flight I/O detached.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
        self.shared.core.lock().close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut Core) -> R) -> Option<R> {
        if self.shared.shutdown.is_cancelled() {
            debug!("autosave call ignored after shutdown");
            return None;
        }

        let result = {
            let mut core = self.shared.core.lock();
            f(&mut *core)
        };
        self.shared.wake.notify_one();
        Some(result)
    }
}

/// A debounced save waiting for its quiet period
struct Debounce {
    at: Instant,
    task: SaveTask,
}

/// The single coalesced save waiting behind an in-flight cycle
struct Queued {
    task: SaveTask,
    waiters: Vec<Responder>,
}

enum Step {
    Attempt { id: u64, deadline: Option<Instant> },
    Backoff(Instant),
    /// Backoff is over; the next attempt waits for the straggler
    Blocked,
}

/// One save cycle: the first attempt plus its retries
struct Cycle {
    task: SaveTask,
    attempts: u32,
    /// `edit_seq` when the cycle began
    started_seq: u64,
    waiters: Vec<Responder>,
    step: Step,
}

impl Cycle {
    fn deadline(&self) -> Option<Instant> {
        match self.step {
            Step::Attempt { deadline, .. } => deadline,
            Step::Backoff(at) => Some(at),
            Step::Blocked => None,
        }
    }

    fn is_attempt(&self, finished: u64) -> bool {
        matches!(self.step, Step::Attempt { id, .. } if id == finished)
    }
}

/// All save bookkeeping
struct Core {
    config: AutosaveConfig,
    state: SaveState,
    state_tx: watch::Sender<SaveState>,
    done_tx: mpsc::UnboundedSender<Finished>,
    runtime: Handle,

    debounce: Option<Debounce>,
    queued: Option<Queued>,
    cycle: Option<Cycle>,
    /// Timed-out or detached attempt that is still running
    straggler: Option<u64>,
    /// Bumped on every recorded edit
    edit_seq: u64,
    next_attempt: u64,
    closed: bool,
}

impl Core {
    fn new(
        config: AutosaveConfig,
        state_tx: watch::Sender<SaveState>,
        done_tx: mpsc::UnboundedSender<Finished>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            state: SaveState::default(),
            state_tx,
            done_tx,
            runtime,
            debounce: None,
            queued: None,
            cycle: None,
            straggler: None,
            edit_seq: 0,
            next_attempt: 0,
            closed: false,
        }
    }

    /// An attempt is running, or a cycle is between attempts
    fn is_busy(&self) -> bool {
        self.cycle.is_some() || self.straggler.is_some()
    }

    fn schedule(&mut self, task: SaveTask) {
        if self.closed {
            return;
        }

        self.edit_seq += 1;
        self.state.is_dirty = true;

        let at = Instant::now() + self.config.debounce;
        let restarted = self.debounce.replace(Debounce { at, task }).is_some();
        trace!(restarted, "autosave debounce armed");

        self.transition(Event::Schedule);
        self.publish();
    }

    fn save_now(&mut self, task: SaveTask, reply: Responder) {
        if self.closed {
            return;
        }

        if self.debounce.take().is_some() {
            debug!("pending autosave superseded by immediate save");
        }

        if self.is_busy() {
            debug!("immediate save queued behind in-flight save");
            self.enqueue(task, Some(reply));
        } else {
            self.start_cycle(task, vec![reply]);
        }
        self.publish();
    }

    fn cancel_pending(&mut self) {
        if self.closed {
            return;
        }

        if self.debounce.take().is_some() {
            debug!("pending autosave cancelled");
            if self.queued.is_none() {
                self.transition(Event::Cancel);
            }
        }
        self.publish();
    }

    fn clear_queue(&mut self) {
        if self.closed {
            return;
        }

        self.debounce = None;

        if let Some(queued) = self.queued.take() {
            reject(queued.waiters, SaveError::Cancelled);
        }

        if let Some(cycle) = self.cycle.take() {
            reject(cycle.waiters, SaveError::Cancelled);
            if let Step::Attempt { id, .. } = cycle.step {
                debug!("in-flight save detached; its result will be discarded");
                self.straggler = Some(id);
            }
        }

        self.state.retry_count = 0;
        self.transition(Event::Clear);
        self.publish();
    }

    /// Earliest debounce, backoff or timeout deadline
    fn next_deadline(&self) -> Option<Instant> {
        if self.closed {
            return None;
        }

        let cycle_at = self.cycle.as_ref().and_then(Cycle::deadline);
        let debounce_at = self.debounce.as_ref().map(|d| d.at);
        match (cycle_at, debounce_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Act on every deadline that has passed
    fn deadline_reached(&mut self, now: Instant) -> Option<Outcome> {
        if self.closed {
            return None;
        }

        let (timed_out, backoff_over) = match self.cycle.as_ref().map(|c| &c.step) {
            Some(Step::Attempt {
                deadline: Some(at), ..
            }) => (*at <= now, false),
            Some(Step::Backoff(at)) => (false, *at <= now),
            _ => (false, false),
        };

        let mut outcome = None;
        if timed_out {
            outcome = self.attempt_timed_out();
        } else if backoff_over {
            self.backoff_elapsed();
        }

        if self.debounce.as_ref().is_some_and(|d| d.at <= now) {
            self.debounce_elapsed();
        }
        outcome
    }

    fn debounce_elapsed(&mut self) {
        let Some(Debounce { task, .. }) = self.debounce.take() else {
            return;
        };

        if self.is_busy() {
            debug!("autosave fired while a save is in flight; queued");
            self.enqueue(task, None);
        } else {
            self.start_cycle(task, Vec::new());
        }
        self.publish();
    }

    fn backoff_elapsed(&mut self) {
        if self.straggler.is_some() {
            if let Some(cycle) = self.cycle.as_mut() {
                debug!("retry waits for the timed-out attempt to finish");
                cycle.step = Step::Blocked;
            }
            return;
        }
        self.retry();
    }

    fn retry(&mut self) {
        let Some(mut cycle) = self.cycle.take() else {
            return;
        };

        cycle.attempts += 1;
        debug!(attempt = cycle.attempts, "retrying save");
        cycle.step = self.launch(&cycle.task);
        self.cycle = Some(cycle);

        self.transition(Event::BackoffElapsed);
        self.publish();
    }

    fn attempt_timed_out(&mut self) -> Option<Outcome> {
        let mut cycle = self.cycle.take()?;
        let Step::Attempt { id, .. } = cycle.step else {
            self.cycle = Some(cycle);
            return None;
        };

        debug_assert!(self.straggler.is_none(), "attempts must not overlap");
        self.straggler = Some(id);
        cycle.step = Step::Blocked;

        let limit = self.config.attempt_timeout.unwrap_or_default();
        let outcome = self.attempt_failed(cycle, AttemptError::TimedOut(limit));
        self.publish();
        outcome
    }

    fn attempt_finished(&mut self, finished: Finished) -> Option<Outcome> {
        if self.closed {
            return None;
        }

        if self.straggler == Some(finished.id) {
            self.straggler = None;
            self.straggler_finished(finished.result);
            return None;
        }

        if !self.cycle.as_ref().is_some_and(|c| c.is_attempt(finished.id)) {
            debug!(id = finished.id, "result of an abandoned attempt dropped");
            return None;
        }
        let cycle = self.cycle.take()?;

        let outcome = match finished.result {
            Ok(saved_at) => Some(self.succeed(cycle, saved_at)),
            Err(err) => self.attempt_failed(cycle, err),
        };
        self.publish();
        outcome
    }

    /// The straggler ended; whatever waited on it may start
    fn straggler_finished(&mut self, result: Result<Timestamp, AttemptError>) {
        match result {
            Ok(saved_at) => debug!("late save at {} discarded", saved_at),
            Err(err) => debug!("late save failure discarded: {}", err),
        }

        match self.cycle.as_ref().map(|c| matches!(c.step, Step::Blocked)) {
            Some(true) => self.retry(),
            Some(false) => {}
            None => self.start_queued(),
        }
        self.publish();
    }

    fn attempt_failed(&mut self, mut cycle: Cycle, err: AttemptError) -> Option<Outcome> {
        if cycle.attempts >= self.config.max_retries {
            return Some(self.exhaust(cycle, err));
        }

        let delay = self.config.backoff.delay(cycle.attempts);
        warn!(
            attempt = cycle.attempts,
            max_retries = self.config.max_retries,
            delay_ms = delay.as_millis() as u64,
            "save attempt failed: {}",
            err
        );

        self.state.retry_count = cycle.attempts;
        cycle.step = Step::Backoff(Instant::now() + delay);
        self.cycle = Some(cycle);
        self.transition(Event::AttemptFailed);
        None
    }

    fn succeed(&mut self, cycle: Cycle, saved_at: Timestamp) -> Outcome {
        info!(attempts = cycle.attempts, "saved at {}", saved_at);

        self.state.last_saved = Some(saved_at);
        self.state.retry_count = 0;
        self.state.last_error = None;
        if self.edit_seq == cycle.started_seq {
            self.state.is_dirty = false;
        }

        for waiter in cycle.waiters {
            let _ = waiter.send(Ok(saved_at));
        }

        self.settle();
        Outcome::Saved(saved_at)
    }

    fn exhaust(&mut self, cycle: Cycle, err: AttemptError) -> Outcome {
        let info = ErrorInfo::new(err.to_string(), cycle.attempts);
        warn!(attempts = cycle.attempts, "save gave up: {}", info.message);

        self.state.retry_count = cycle.attempts;
        self.state.last_error = Some(info.clone());
        self.state.is_dirty = true;

        reject(cycle.waiters, SaveError::RetriesExhausted(info.clone()));

        self.settle();
        Outcome::Failed(info)
    }

    /// Close out the finished cycle and start whatever waited behind it
    fn settle(&mut self) {
        let queued = self.queued.is_some();
        self.transition(Event::Settled { queued });
        self.start_queued();
    }

    fn start_queued(&mut self) {
        if self.is_busy() {
            return;
        }
        if let Some(Queued { task, waiters }) = self.queued.take() {
            self.start_cycle(task, waiters);
        }
    }

    fn start_cycle(&mut self, task: SaveTask, waiters: Vec<Responder>) {
        debug_assert!(!self.is_busy(), "save cycles must not overlap");

        let step = self.launch(&task);
        self.cycle = Some(Cycle {
            task,
            attempts: 1,
            started_seq: self.edit_seq,
            waiters,
            step,
        });

        self.state.retry_count = 0;
        self.transition(Event::Start);
        debug!("save started");
    }

    /// Spawn one attempt; its result comes back through `done_tx`
    fn launch(&mut self, task: &SaveTask) -> Step {
        let id = self.next_attempt;
        self.next_attempt += 1;

        let attempt = AssertUnwindSafe(task.invoke()).catch_unwind();
        let done = self.done_tx.clone();
        self.runtime.spawn(async move {
            let result = match attempt.await {
                Ok(result) => result.map_err(AttemptError::Task),
                Err(_) => Err(AttemptError::Panicked),
            };
            let _ = done.send(Finished { id, result });
        });

        Step::Attempt {
            id,
            deadline: self.config.attempt_timeout.map(|limit| Instant::now() + limit),
        }
    }

    fn enqueue(&mut self, task: SaveTask, reply: Option<Responder>) {
        match &mut self.queued {
            Some(queued) => {
                queued.task = task;
                queued.waiters.extend(reply);
            }
            None => {
                self.queued = Some(Queued {
                    task,
                    waiters: reply.into_iter().collect(),
                });
            }
        }
        self.transition(Event::Schedule);
    }

    fn transition(&mut self, event: Event) {
        match self.state.phase.on(event) {
            Some(next) => {
                if next != self.state.phase {
                    trace!(from = ?self.state.phase, to = ?next, ?event, "autosave phase");
                }
                self.state.phase = next;
            }
            None => debug!(phase = ?self.state.phase, ?event, "ignored autosave event"),
        }
    }

    /// Derive flags from the bookkeeping and publish if anything changed
    fn publish(&mut self) {
        self.state.is_pending = self.debounce.is_some() || self.queued.is_some();
        self.state.is_saving = self.cycle.is_some();

        let next = self.state.clone();
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Stop for good. The published state is left as it was.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.debounce = None;
        // Dropped responders resolve waiting `save_now` calls with `Closed`
        self.queued = None;
        if self.cycle.take().is_some() || self.straggler.take().is_some() {
            debug!("in-flight save detached on shutdown");
        }
        debug!("autosave coordinator closed");
    }
}

struct Worker {
    shared: Arc<Shared>,
    observer: Arc<dyn SaveObserver>,
    finished: mpsc::UnboundedReceiver<Finished>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let deadline = self.shared.core.lock().next_deadline();

            tokio::select! {
                biased;

                _ = self.shared.shutdown.cancelled() => break,

                Some(finished) = self.finished.recv() => {
                    let outcome = self.shared.core.lock().attempt_finished(finished);
                    self.report(outcome);
                }

                _ = self.shared.wake.notified() => {}

                _ = wait_until(deadline) => {
                    let outcome = self.shared.core.lock().deadline_reached(Instant::now());
                    self.report(outcome);
                }
            }
        }

        self.shared.core.lock().close();
        debug!("autosave worker stopped");
    }

    fn report(&self, outcome: Option<Outcome>) {
        match outcome {
            Some(Outcome::Saved(saved_at)) => self.observer.on_success(saved_at),
            Some(Outcome::Failed(info)) => self.observer.on_error(&info),
            None => {}
        }
    }
}

fn reject(waiters: Vec<Responder>, err: SaveError) {
    for waiter in waiters {
        let _ = waiter.send(Err(err.clone()));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
