use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

/// Initialize file-based logging.
///
/// Logs go to a file, never stdout: the TUI owns the terminal and CLI
/// output is meant for people and scripts. `RUST_LOG` overrides `level`.
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// entries are flushed, or `None` if the log file location is unusable.
pub fn init_logging(level: &str, log_path: &Path) -> Option<WorkerGuard> {
    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;
    std::fs::create_dir_all(log_dir).ok()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
