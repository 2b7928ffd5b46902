//! Numeric coercion and missing value imputation

use std::cmp::Ordering;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::columns::has_column;
use crate::error::{PipelineError, Result};

/// How the fill value for a coerced column is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ImputeStrategy {
    Mean,
    Median,
    /// Most frequent value; any unrecognized strategy name selects this
    MostFrequent,
}

impl From<String> for ImputeStrategy {
    fn from(s: String) -> Self {
        match s.as_str() {
            "mean" => ImputeStrategy::Mean,
            "median" => ImputeStrategy::Median,
            _ => ImputeStrategy::MostFrequent,
        }
    }
}

impl std::fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImputeStrategy::Mean => write!(f, "mean"),
            ImputeStrategy::Median => write!(f, "median"),
            ImputeStrategy::MostFrequent => write!(f, "most_frequent"),
        }
    }
}

/// What was filled in a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub filled: usize,
    pub fill_value: f64,
}

/// Coerce the listed columns to `Float64` and fill their missing values.
///
/// Unparseable strings and NaN count as missing. Columns absent from the
/// table are skipped with a warning; columns not listed are left untouched.
pub fn coerce_and_impute(
    mut df: DataFrame,
    strategy: ImputeStrategy,
    numeric_to_coerce: &[String],
) -> Result<(DataFrame, Vec<ImputationRecord>)> {
    let mut records = Vec::new();

    for name in numeric_to_coerce {
        if !has_column(&df, name) {
            warn!("Column '{}' not in dataframe during coercion.", name);
            continue;
        }

        let values = coerce_to_float(df.column(name)?)?;
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let fill_value = compute_fill_value(&observed, strategy).ok_or_else(|| {
            PipelineError::Validation(format!(
                "Cannot impute column '{}': it has no numeric values",
                name
            ))
        })?;

        let filled = values.len() - observed.len();
        let imputed: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(fill_value)).collect();
        df.with_column(Series::new(name.as_str().into(), imputed))?;

        info!("Imputed {} NaNs in '{}' using {}.", filled, name, strategy);
        records.push(ImputationRecord {
            column: name.clone(),
            filled,
            fill_value,
        });
    }

    Ok((df, records))
}

/// Convert any column to optional floats; unparseable entries become `None`
pub fn coerce_to_float(col: &Column) -> Result<Vec<Option<f64>>> {
    let values: Vec<Option<f64>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        dt if dt.is_primitive_numeric() || matches!(dt, DataType::Boolean) => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?.into_iter().collect()
        }
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
                .collect()
        }
    };

    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Fill value for the observed (non-missing) values, `None` when empty
pub fn compute_fill_value(observed: &[f64], strategy: ImputeStrategy) -> Option<f64> {
    if observed.is_empty() {
        return None;
    }
    match strategy {
        ImputeStrategy::Mean => Some(observed.iter().sum::<f64>() / observed.len() as f64),
        ImputeStrategy::Median => {
            let sorted = sorted_copy(observed);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                Some((sorted[mid - 1] + sorted[mid]) / 2.0)
            } else {
                Some(sorted[mid])
            }
        }
        ImputeStrategy::MostFrequent => {
            // Longest run in sorted order; the first (smallest) value wins ties
            let sorted = sorted_copy(observed);
            let mut best = (sorted[0], 0usize);
            let mut start = 0;
            for i in 1..=sorted.len() {
                if i == sorted.len() || sorted[i] != sorted[start] {
                    let run = i - start;
                    if run > best.1 {
                        best = (sorted[start], run);
                    }
                    start = i;
                }
            }
            Some(best.0)
        }
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing_falls_back_to_mode() {
        assert_eq!(ImputeStrategy::from("mean".to_string()), ImputeStrategy::Mean);
        assert_eq!(ImputeStrategy::from("median".to_string()), ImputeStrategy::Median);
        assert_eq!(
            ImputeStrategy::from("most_frequent".to_string()),
            ImputeStrategy::MostFrequent
        );
        assert_eq!(
            ImputeStrategy::from("anything".to_string()),
            ImputeStrategy::MostFrequent
        );
    }

    #[test]
    fn test_strategy_names_are_case_sensitive() {
        assert_eq!(ImputeStrategy::from("Mean".to_string()), ImputeStrategy::MostFrequent);
        assert_eq!(ImputeStrategy::from(" median".to_string()), ImputeStrategy::MostFrequent);
    }

    #[test]
    fn test_fill_values() {
        let observed = [1.0, 2.0, 2.0, 7.0];
        assert_eq!(compute_fill_value(&observed, ImputeStrategy::Mean), Some(3.0));
        assert_eq!(compute_fill_value(&observed, ImputeStrategy::Median), Some(2.0));
        assert_eq!(
            compute_fill_value(&observed, ImputeStrategy::MostFrequent),
            Some(2.0)
        );
        assert_eq!(compute_fill_value(&[], ImputeStrategy::Mean), None);
    }

    #[test]
    fn test_mode_ties_pick_smallest() {
        let observed = [5.0, 3.0, 5.0, 3.0, 9.0];
        assert_eq!(
            compute_fill_value(&observed, ImputeStrategy::MostFrequent),
            Some(3.0)
        );
    }

    #[test]
    fn test_odd_median() {
        assert_eq!(
            compute_fill_value(&[9.0, 1.0, 5.0], ImputeStrategy::Median),
            Some(5.0)
        );
    }

    #[test]
    fn test_coerce_strings_with_blanks() {
        let df = df! {
            "TotalCharges" => [Some("29.85"), Some(" "), Some(" 1889.5"), None, Some("abc")],
        }
        .unwrap();

        let values = coerce_to_float(df.column("TotalCharges").unwrap()).unwrap();
        assert_eq!(values, vec![Some(29.85), None, Some(1889.5), None, None]);
    }
}
