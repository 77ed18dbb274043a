//! Workflow integration tests
//!
//! Tests for complete workflows that exercise multiple commands
//! and validate end-to-end behavior.

pub mod config_commands;
pub mod edit_session;
pub mod save_and_status;
pub mod snapshot_restore_gc;
