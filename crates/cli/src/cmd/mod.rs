//! CLI command implementations

pub mod config;
pub mod diff;
pub mod edit;
pub mod gc;
pub mod init;
pub mod log;
pub mod restore;
pub mod save;
pub mod show;
pub mod snapshot;
pub mod status;
