//! File-based diagnostics logging.
//!
//! The dashboard owns stdout, so tracing output goes to a file (when one is
//! configured) and nowhere else. Filtering comes from the `TTOP_LOG` env
//! var, defaulting to `info`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber writing to `path`.
///
/// Returns the appender guard; dropping it flushes buffered log lines, so
/// the caller holds it for the life of the process. No-op when `path` is
/// `None`.
pub fn init(path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TTOP_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
