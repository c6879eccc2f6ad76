use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides the log directory, e.g. for CI runners without a writable home.
pub const LOG_DIR_ENV: &str = "TESTSCOPE_LOG_DIR";

/// `$TESTSCOPE_LOG_DIR`, else `~/.testscope/logs`, else `./.testscope/logs`.
pub fn log_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".testscope")
        .join("logs")
}

/// Installs the global subscriber: a daily rolling file named after
/// `component` and, with `to_stderr`, a colored stderr layer.
///
/// The returned guard flushes the file writer when dropped. A second call in
/// the same process keeps the first subscriber.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let dir = log_dir();
    let _ = std::fs::create_dir_all(&dir);

    let file_appender = tracing_appender::rolling::daily(&dir, component);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_ends_with_testscope_logs_by_default() {
        if std::env::var_os(LOG_DIR_ENV).is_some() {
            return;
        }
        assert!(log_dir().ends_with(".testscope/logs"));
    }
}
