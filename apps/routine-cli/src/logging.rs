//! `tracing` subscriber setup
//!
//! Stdout output is human readable or JSON. When a log file is configured the
//! same events also go to a daily rolling file through a non-blocking writer;
//! keep the returned guard alive until shutdown so buffered lines are flushed.

use anyhow::{anyhow, Context};
use routine_core::RoutineConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::Registry,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// `RUST_LOG` when set, otherwise the configured level
#[must_use]
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Directory and file name prefix for the rolling appender
///
/// # Errors
/// Returns an error if the path has no file name
pub fn log_file_parts(path: &Path) -> anyhow::Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((dir, file_name.to_string()))
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed
pub fn init_logging(config: &RoutineConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.json_logs {
        layers.push(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .boxed(),
        );
    }

    let guard = match &config.log_file {
        Some(path) => {
            let (dir, file_name) = log_file_parts(path)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::daily(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
            layers.push(if config.json_logs {
                file_layer.json().boxed()
            } else {
                file_layer.boxed()
            });
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(&config.log_level))
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {e}"))?;

    info!("Tracing initialized with level: {}", config.log_level);
    Ok(guard)
}
