//! Error types for the preparation pipeline.
//!
//! Every stage returns [`Result`]; the binary wraps these in `anyhow` for
//! top-level reporting. All variants abort the run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing a dataset.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the input or writing an artifact failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is missing a key or holds an invalid value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required column is absent from the table.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Target values that have no code in the configured mapping.
    #[error(
        "Target mapping produced missing codes for column '{column}'. \
         First few problematic values: {examples:?}"
    )]
    Mapping {
        column: String,
        examples: Vec<String>,
    },

    /// Data that is present but unusable (wrong type, out of range, bad shape).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stratified splitting is impossible for the requested ratio.
    #[error("Split error: {0}")]
    Split(String),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    /// Encoding a JSON or YAML document failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Wrap an `io::Error` with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
