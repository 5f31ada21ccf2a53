//! File logging setup.
//!
//! Logs go to a daily-rolling file so stdout stays reserved for streamed
//! responses. The filter comes from `QCHAT_LOG`, then `RUST_LOG`, then `info`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "QCHAT_LOG";

const LOG_FILE_PREFIX: &str = "qchat.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a global subscriber writing to `<log_dir>/qchat.log.<date>`.
///
/// Returns the writer guard, which must be held until exit so buffered lines
/// are flushed. Returns `None` if the directory cannot be created or a
/// subscriber is already installed; the process then runs without logs.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Warning: logging disabled, cannot create {}: {e}",
            log_dir.display()
        );
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .ok()?;
    Some(guard)
}
