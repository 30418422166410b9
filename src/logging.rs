//! Tracing setup. The terminal belongs to the table, so logs go to a file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::domain::SVError;

/// Used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "sv=info,warn";

pub fn init(log_file: &str) -> Result<PathBuf, SVError> {
    let path = log_path(log_file)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| SVError::Logging(e.to_string()))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sv starting up");
    Ok(path)
}

fn log_path(log_file: &str) -> Result<PathBuf, SVError> {
    let expanded = shellexpand::full(log_file)
        .map_err(|e| SVError::Logging(format!("{log_file}: {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
