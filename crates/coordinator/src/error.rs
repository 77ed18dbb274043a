//! Error types for autosave coordination

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Description of a save cycle that ran out of attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Message of the last failed attempt
    pub message: String,
    /// Attempts made in the cycle
    pub attempts: u32,
    /// Local time the cycle gave up (Unix milliseconds)
    pub at_unix_ms: u64,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, attempts: u32) -> Self {
        let at_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            message: message.into(),
            attempts,
            at_unix_ms,
        }
    }
}

/// Outcome of an immediate save that did not produce a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("save failed after {} attempts: {}", .0.attempts, .0.message)]
    RetriesExhausted(ErrorInfo),

    #[error("save was discarded before it completed")]
    Cancelled,

    #[error("autosave coordinator is shut down")]
    Closed,
}

/// Failure of a single attempt; always retryable
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0:#}")]
    Task(anyhow::Error),

    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    #[error("save task panicked")]
    Panicked,
}

/// Rejected coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_retries must be at least 1")]
    NoAttempts,

    #[error("backoff base delay {base:?} exceeds max delay {max:?}")]
    BackoffRange { base: Duration, max: Duration },

    #[error("attempt timeout must be non-zero (use None to disable)")]
    ZeroTimeout,
}
