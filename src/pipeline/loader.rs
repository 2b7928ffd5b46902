//! Dataset loader for delimited text files

use std::path::Path;

use polars::prelude::*;
use tracing::{error, info};

use super::columns::has_column;
use crate::error::{PipelineError, Result};

/// Rows used for CSV schema inference
const INFER_SCHEMA_LENGTH: usize = 10_000;

/// Load a delimited file with a header row.
///
/// `.tsv` files are tab separated; every other file, whatever its extension,
/// is read as comma separated. A missing or unreadable file is logged and
/// returned as an I/O error.
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    let separator = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    };

    if let Err(e) = std::fs::metadata(path) {
        error!("Failed to load data from {}: {}", path.display(), e);
        return Err(PipelineError::io(path, e));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_separator(separator)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .finish()
        .and_then(|lf| lf.collect())
        .inspect_err(|e| error!("Failed to load data from {}: {}", path.display(), e))?;

    info!(
        "Loaded data from {} with shape ({}, {})",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Drop the configured columns that exist in the table; absent ones are ignored
pub fn drop_columns(mut df: DataFrame, columns: &[String]) -> Result<(DataFrame, Vec<String>)> {
    let mut dropped = Vec::new();
    for col in columns {
        if has_column(&df, col) {
            df.drop_in_place(col)?;
            info!("Dropped column: {}", col);
            dropped.push(col.clone());
        }
    }
    Ok((df, dropped))
}

/// Count missing values per column, sorted descending.
///
/// Columns without any missing value are omitted.
pub fn missing_value_counts(df: &DataFrame) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = df
        .get_columns()
        .iter()
        .map(|c| (c.name().to_string(), c.null_count()))
        .filter(|(_, n)| *n > 0)
        .collect();

    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
