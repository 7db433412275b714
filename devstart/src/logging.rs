//! Tracing setup: a daily rolling log file under `<home>/logs` plus warnings on
//! stderr. `RUST_LOG` controls the file filter (default `info`).

use crate::layout::FilesystemLayout;
use devstart_shared::errors::{DevstartError, DevstartResult};
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Keeps the non-blocking writer flushing for the life of the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init_logging_for(layout: &FilesystemLayout) -> DevstartResult<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        DevstartError::Storage(format!(
            "Failed to create log directory {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "devstart.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(env_filter);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(LevelFilter::WARN);

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
    {
        // Someone (usually a test harness) already installed a subscriber.
        tracing::debug!("Tracing subscriber already set: {}", e);
        return Ok(());
    }

    let _ = LOG_GUARD.set(guard);
    tracing::debug!(logs_dir = %logs_dir.display(), "Logging initialized");
    Ok(())
}
