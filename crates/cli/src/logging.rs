//! Tracing setup for the `sp` binary

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Name of the edit-session log inside `.sp/logs`
pub const SESSION_LOG: &str = "session.log";

/// Install the global subscriber
///
/// Stderr follows `RUST_LOG` (default `warn`). With `log_dir`, info-level
/// events also go to `session.log` there; keep the returned guard alive so
/// buffered lines are flushed on exit.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, SESSION_LOG);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::INFO);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A second init (tests running main paths) is harmless
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}
