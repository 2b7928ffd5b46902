//! Logging setup
//!
//! Builds a subscriber that writes every event at the configured level to a
//! log file and only warnings and errors to the console. Console progress is
//! the per-stage step header and spinner driven by `StageEvent`s, so info
//! lines stay out of the spinner's way. `RUST_LOG` overrides the configured
//! level of the file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::artifacts::ensure_parent_dir;
use crate::error::{PipelineError, Result};

/// Build the run's subscriber; install it with
/// `tracing::subscriber::with_default` for the duration of the run.
pub fn build_subscriber(file: &Path, level: &str) -> Result<impl Subscriber + Send + Sync + 'static> {
    ensure_parent_dir(file)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .map_err(|e| PipelineError::io(file, e))?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(file_filter);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    Ok(tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scoped_subscriber_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/pipeline.log");

        let subscriber = build_subscriber(&path, "info").unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Loaded data with shape (3, 2)");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Loaded data with shape (3, 2)"));
        assert!(contents.contains("INFO"));
    }
}
