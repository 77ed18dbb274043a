//! Save state snapshots and the phase transition table

use crate::error::ErrorInfo;
use crate::task::Timestamp;
use std::fmt;

/// Coarse lifecycle of the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing scheduled, nothing running
    #[default]
    Idle,
    /// A save is scheduled but has not started
    Pending,
    /// An attempt is running
    Saving,
    /// An attempt failed; waiting out the backoff before the next one
    Retrying,
}

/// Inputs that move the coordinator between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// An edit scheduled a debounced save
    Schedule,
    /// A save cycle began its first attempt
    Start,
    /// An attempt failed and another one will follow
    AttemptFailed,
    /// Backoff finished; the next attempt began
    BackoffElapsed,
    /// The cycle finished (success or exhausted); `queued` if another save waits
    Settled { queued: bool },
    /// The debounce timer was cancelled
    Cancel,
    /// Pending work was discarded and any in-flight save detached
    Clear,
}

impl Phase {
    /// Transition table. `None` means the event does not apply in this phase.
    pub fn on(self, event: Event) -> Option<Phase> {
        use Event::*;
        use Phase::*;

        match (self, event) {
            (_, Clear) => Some(Idle),

            (Idle | Pending, Schedule) => Some(Pending),
            (Idle | Pending, Start) => Some(Saving),
            (Idle | Pending, Cancel) => Some(Idle),

            (Saving, Schedule | Cancel) => Some(Saving),
            (Saving, AttemptFailed) => Some(Retrying),

            (Retrying, Schedule | Cancel) => Some(Retrying),
            (Retrying, BackoffElapsed) => Some(Saving),

            (Saving | Retrying, Settled { queued: true }) => Some(Pending),
            (Saving | Retrying, Settled { queued: false }) => Some(Idle),

            _ => None,
        }
    }
}

/// Read-only view of the coordinator's bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveState {
    pub phase: Phase,
    /// A change was recorded since the last successful save began
    pub is_dirty: bool,
    /// A save is scheduled or queued but has not started
    pub is_pending: bool,
    /// A save cycle is in flight (attempts and backoff waits)
    pub is_saving: bool,
    /// Timestamp returned by the most recent successful save
    pub last_saved: Option<Timestamp>,
    /// Failed attempts in the current (or last exhausted) cycle
    pub retry_count: u32,
    /// Last exhausted failure; cleared by the next success
    pub last_error: Option<ErrorInfo>,
}

impl SaveState {
    /// What a status indicator should show
    pub fn status(&self) -> SaveStatus {
        if self.is_saving {
            SaveStatus::Saving
        } else if let (Some(err), true) = (&self.last_error, self.is_dirty) {
            SaveStatus::Failed(err.message.clone())
        } else if self.is_dirty || self.is_pending {
            SaveStatus::Unsaved
        } else {
            SaveStatus::Saved(self.last_saved)
        }
    }
}

/// User-facing summary of a [`SaveState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saving,
    Failed(String),
    Unsaved,
    Saved(Option<Timestamp>),
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveStatus::Saving => write!(f, "Saving…"),
            SaveStatus::Failed(message) => write!(f, "Save failed: {}", message),
            SaveStatus::Unsaved => write!(f, "Unsaved changes"),
            SaveStatus::Saved(_) => write!(f, "All changes saved"),
        }
    }
}
