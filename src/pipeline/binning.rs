//! Bucketing of a continuous column into labelled half-open intervals

use polars::prelude::*;
use tracing::info;

use super::columns::{has_column, numeric_values};
use crate::error::{PipelineError, Result};

/// Source column for the tenure buckets
pub const TENURE_COLUMN: &str = "tenure";

/// Column added by the tenure bucketing step
pub const TENURE_CATEGORY_COLUMN: &str = "TenureCategory";

/// Index of the interval `[edges[i], edges[i + 1])` holding `value`
pub fn assign_bucket(value: f64, edges: &[f64]) -> Option<usize> {
    edges
        .windows(2)
        .position(|w| value >= w[0] && value < w[1])
}

/// Add a string column labelling each row with its interval of `source`.
///
/// Rows outside every interval, and null sources, get a null label. When
/// `source` is absent the table is returned unchanged.
pub fn add_bucket_column(
    mut df: DataFrame,
    source: &str,
    target: &str,
    edges: &[f64],
    labels: &[String],
) -> Result<DataFrame> {
    if !has_column(&df, source) {
        info!("Column '{}' not present, skipping binning", source);
        return Ok(df);
    }

    if labels.len() + 1 != edges.len() {
        return Err(PipelineError::Validation(format!(
            "{} labels given for {} bin edges",
            labels.len(),
            edges.len()
        )));
    }

    let values = numeric_values(&df, source)?;
    let buckets: Vec<Option<&str>> = values
        .iter()
        .map(|v| {
            v.and_then(|x| assign_bucket(x, edges))
                .map(|i| labels[i].as_str())
        })
        .collect();

    let unassigned = buckets.iter().filter(|b| b.is_none()).count();
    df.with_column(Series::new(target.into(), buckets))?;

    info!(
        "Added '{}' from '{}' ({} rows outside all bins)",
        target, source, unassigned
    );
    Ok(df)
}
