//! Autosave coordination for Savepoint
//!
//! This crate provides the save scheduler that sits between an editor session
//! and its backing store:
//! - Trailing-edge debouncing of edit-driven saves
//! - Mutual exclusion (one save attempt in flight at a time)
//! - Coalescing of requests that arrive while a save is running
//! - Retry with bounded backoff and a per-attempt timeout
//! - Dirty / pending / saving / last-saved bookkeeping for status display

pub mod backoff;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod observer;
pub mod state;
pub mod task;

// Re-exports
pub use backoff::BackoffPolicy;
pub use config::AutosaveConfig;
pub use coordinator::AutosaveCoordinator;
pub use error::{ConfigError, ErrorInfo, SaveError};
pub use observer::{NoopObserver, SaveObserver};
pub use state::{Event, Phase, SaveState, SaveStatus};
pub use task::{SaveTask, Timestamp};
