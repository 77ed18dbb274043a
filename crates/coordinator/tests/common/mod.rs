//! Shared helpers for coordinator tests

#![allow(dead_code)]

use coordinator::{
    AutosaveConfig, AutosaveCoordinator, BackoffPolicy, ErrorInfo, SaveObserver, SaveTask,
    Timestamp,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

pub const DEBOUNCE: Duration = Duration::from_millis(200);
pub const BACKOFF: Duration = Duration::from_millis(100);

/// Short debounce, fixed backoff, three attempts
pub fn test_config() -> AutosaveConfig {
    AutosaveConfig::default()
        .with_debounce(DEBOUNCE)
        .with_max_retries(3)
        .with_backoff(BackoffPolicy::Fixed(BACKOFF))
}

pub fn spawn_with(config: AutosaveConfig) -> (AutosaveCoordinator, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let coordinator = AutosaveCoordinator::spawn(config, recorder.clone()).unwrap();
    (coordinator, recorder)
}

pub fn spawn() -> (AutosaveCoordinator, Arc<Recorder>) {
    spawn_with(test_config())
}

/// Let the clock run long enough for every scheduled save to settle
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}

pub fn ts(ms: u64) -> Timestamp {
    Timestamp::from_unix_ms(ms)
}

/// Observer that records every callback
#[derive(Default)]
pub struct Recorder {
    successes: Mutex<Vec<Timestamp>>,
    errors: Mutex<Vec<ErrorInfo>>,
}

impl Recorder {
    pub fn successes(&self) -> Vec<Timestamp> {
        self.successes.lock().clone()
    }

    pub fn errors(&self) -> Vec<ErrorInfo> {
        self.errors.lock().clone()
    }
}

impl SaveObserver for Recorder {
    fn on_success(&self, saved_at: Timestamp) {
        self.successes.lock().push(saved_at);
    }

    fn on_error(&self, error: &ErrorInfo) {
        self.errors.lock().push(error.clone());
    }
}

/// One recorded attempt
#[derive(Debug, Clone)]
pub struct Run {
    pub label: u64,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// Attempt log shared by scripted tasks
#[derive(Default, Clone)]
pub struct TaskLog {
    runs: Arc<Mutex<Vec<Run>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl TaskLog {
    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().clone()
    }

    pub fn labels(&self) -> Vec<u64> {
        self.runs.lock().iter().map(|r| r.label).collect()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn begin(&self, label: u64) -> usize {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let mut runs = self.runs.lock();
        runs.push(Run {
            label,
            started: Instant::now(),
            finished: None,
        });
        runs.len() - 1
    }

    fn end(&self, index: usize) {
        self.runs.lock()[index].finished = Some(Instant::now());
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Task that takes `duration`, then resolves to `saved_at` (or fails every time)
pub fn timed_task(
    log: &TaskLog,
    label: u64,
    duration: Duration,
    saved_at: u64,
    fail: bool,
) -> SaveTask {
    let log = log.clone();
    SaveTask::new(move || {
        let log = log.clone();
        async move {
            let index = log.begin(label);
            tokio::time::sleep(duration).await;
            log.end(index);
            if fail {
                anyhow::bail!("backend unavailable ({})", label);
            }
            Ok(Timestamp::from_unix_ms(saved_at))
        }
    })
}

/// Task that fails its first `failures` attempts, then succeeds
pub fn flaky_task(attempts: &Arc<AtomicU32>, failures: u32, saved_at: u64) -> SaveTask {
    let attempts = attempts.clone();
    SaveTask::new(move || {
        let attempts = attempts.clone();
        async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                anyhow::bail!("transient failure #{}", n);
            }
            Ok(Timestamp::from_unix_ms(saved_at))
        }
    })
}

/// Task that blocks until the gate gets a permit
pub fn gated_task(gate: &Arc<Semaphore>, finished: &Arc<AtomicBool>, saved_at: u64) -> SaveTask {
    let gate = gate.clone();
    let finished = finished.clone();
    SaveTask::new(move || {
        let gate = gate.clone();
        let finished = finished.clone();
        async move {
            let permit = gate.acquire().await?;
            permit.forget();
            finished.store(true, Ordering::SeqCst);
            Ok(Timestamp::from_unix_ms(saved_at))
        }
    })
}

/// Task whose write runs on a blocking thread and cannot be cut short
pub fn blocking_task(log: &TaskLog, label: u64, duration: Duration, saved_at: u64) -> SaveTask {
    let log = log.clone();
    SaveTask::new(move || {
        let log = log.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let index = log.begin(label);
                std::thread::sleep(duration);
                log.end(index);
            })
            .await?;
            Ok(Timestamp::from_unix_ms(saved_at))
        }
    })
}
