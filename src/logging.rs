use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{LakehouseError, Result};

const LOG_FILE_PREFIX: &str = "lakehouse.log";

/// Initializes logging with a console layer and a daily-rotated JSON file layer.
///
/// Console logs go to stderr so stdout carries only the pipeline report.
/// When `log_dir` cannot be used, logging continues on the console alone.
/// Keep the returned guard alive until exit or buffered file logs are lost.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let (file_layer, guard, file_error) = match file_appender(log_dir) {
        Ok(appender) => {
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    // RUST_LOG wins when set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("taxi_lakehouse=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled: {}", e);
    }
    guard
}

/// Daily-rotated appender under `log_dir`, creating the directory if needed.
pub fn file_appender(log_dir: &Path) -> Result<RollingFileAppender> {
    let unusable = |reason: String| {
        LakehouseError::Config(format!(
            "cannot write logs to '{}': {}",
            log_dir.display(),
            reason
        ))
    };
    fs::create_dir_all(log_dir).map_err(|e| unusable(e.to_string()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
        .map_err(|e| unusable(e.to_string()))
}
