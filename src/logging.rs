use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Keeps the background log writer alive. Dropping it flushes pending lines.
pub(crate) struct LogGuard {
    pub path: PathBuf,
    _guard: WorkerGuard,
}

pub(crate) fn access_log_path(logs_dir: &Path) -> PathBuf {
    let now = chrono::Utc::now().timestamp();
    logs_dir.join(format!("access-log-{}.log", now))
}

/// File layer always, stdout layer when `echo_stdout` is set.
fn build_subscriber(
    file_writer: NonBlocking,
    verbose: bool,
    echo_stdout: bool,
) -> impl tracing::Subscriber + Send + Sync {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);
    let stdout_layer = echo_stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(level)
        .with(file_layer)
        .with(stdout_layer)
}

/// Install the global subscriber writing to `<logs_dir>/access-log-<unix>.log`.
/// Hold the returned guard for the life of the process.
pub(crate) fn init(logs_dir: &Path, verbose: bool, echo_stdout: bool) -> Result<LogGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;
    let path = access_log_path(logs_dir);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open access log {}", path.display()))?;

    let (file_writer, guard) = tracing_appender::non_blocking(file);
    tracing::subscriber::set_global_default(build_subscriber(file_writer, verbose, echo_stdout))
        .context("a global tracing subscriber is already installed")?;

    Ok(LogGuard {
        path,
        _guard: guard,
    })
}
