//! Library half of the `sp` command-line tool
//!
//! Commands in the binary are thin wrappers over these modules, which the
//! integration tests drive directly.

pub mod config;
pub mod diff_utils;
pub mod locks;
pub mod logging;
pub mod session;
pub mod util;
pub mod workspace;
