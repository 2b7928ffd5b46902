//! Target column mapping and validation
//!
//! Raw labels (for example "Yes"/"No") are replaced by the integer codes
//! from the configuration. Every row must map; a single unmapped value
//! aborts the run before anything is written. Without a mapping, textual
//! labels are coded in sorted order.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use tracing::info;

use super::columns::{column_to_string_vec, is_categorical_dtype, unique_values_as_strings};
use crate::error::{PipelineError, Result};

/// Maximum number of offending values surfaced in a mapping error
const MAX_UNMAPPED_EXAMPLES: usize = 5;

fn target_column<'a>(df: &'a DataFrame, target: &str) -> Result<&'a Column> {
    df.column(target).map_err(|_| {
        PipelineError::Schema(format!("Target column '{}' not found in data.", target))
    })
}

/// Replace target labels with their configured codes.
///
/// Values are trimmed before lookup. Nulls and labels without a code fail
/// with [`PipelineError::Mapping`] listing the first few offenders.
pub fn map_target(
    mut df: DataFrame,
    target: &str,
    mapping: &BTreeMap<String, i64>,
) -> Result<DataFrame> {
    let col = target_column(&df, target)?;

    info!(
        "Unique values before mapping: {:?}",
        unique_values_as_strings(col)?
    );
    info!("Mapping being used: {:?}", mapping);

    let raw = column_to_string_vec(col)?;
    let mut codes: Vec<i64> = Vec::with_capacity(raw.len());
    let mut unmapped: Vec<String> = Vec::new();

    for value in &raw {
        match value.as_deref().map(str::trim).and_then(|v| mapping.get(v)) {
            Some(code) => codes.push(*code),
            None => {
                if unmapped.len() < MAX_UNMAPPED_EXAMPLES {
                    unmapped.push(value.clone().unwrap_or_else(|| "null".to_string()));
                }
            }
        }
    }

    if !unmapped.is_empty() {
        return Err(PipelineError::Mapping {
            column: target.to_string(),
            examples: unmapped,
        });
    }

    df.with_column(Series::new(target.into(), codes))?;

    info!(
        "Unique values after mapping: {:?}",
        target_class_counts(&df, target)?.keys().collect::<Vec<_>>()
    );
    info!("Mapped target column '{}' using provided mapping.", target);
    Ok(df)
}

/// Give an unmapped target integer class codes.
///
/// A target that already holds integer codes goes through
/// [`ensure_integer_target`] and no class names are returned. A textual
/// target has its distinct labels sorted and coded `0..n` in that order;
/// the returned names turn codes back into labels. Nulls are rejected.
pub fn encode_target_labels(
    mut df: DataFrame,
    target: &str,
) -> Result<(DataFrame, Option<Vec<String>>)> {
    let col = target_column(&df, target)?;
    if !is_categorical_dtype(col.dtype()) {
        return Ok((ensure_integer_target(df, target)?, None));
    }

    let raw = column_to_string_vec(col)?;
    if raw.iter().flatten().all(|v| v.trim().parse::<i64>().is_ok()) {
        return Ok((ensure_integer_target(df, target)?, None));
    }

    let nulls = raw.iter().filter(|v| v.is_none()).count();
    if nulls > 0 {
        return Err(PipelineError::Validation(format!(
            "Target column '{}' has {} missing value(s)",
            target, nulls
        )));
    }

    let labels: Vec<String> = raw.into_iter().flatten().collect();
    let classes: Vec<String> = labels
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<&str, i64> = classes
        .iter()
        .enumerate()
        .map(|(code, label)| (label.as_str(), code as i64))
        .collect();
    let codes: Vec<i64> = labels.iter().map(|label| index[label.as_str()]).collect();

    df.with_column(Series::new(target.into(), codes))?;
    info!(
        "No target mapping configured; coded labels of '{}' as {:?}",
        target,
        classes.iter().enumerate().collect::<Vec<_>>()
    );
    Ok((df, Some(classes)))
}

/// Turn class codes back into the labels they were assigned from
pub fn decode_labels(codes: &[i64], classes: &[String]) -> Result<Vec<String>> {
    codes
        .iter()
        .map(|&code| {
            usize::try_from(code)
                .ok()
                .and_then(|i| classes.get(i))
                .cloned()
                .ok_or_else(|| {
                    PipelineError::Validation(format!(
                        "Class code {} has no label ({} classes)",
                        code,
                        classes.len()
                    ))
                })
        })
        .collect()
}

/// Ensure an unmapped target already holds integer class codes.
///
/// Integer columns are widened to `i64`; float columns must hold whole
/// numbers; string columns must parse as integers. Nulls are rejected.
pub fn ensure_integer_target(mut df: DataFrame, target: &str) -> Result<DataFrame> {
    let labels = target_labels(&df, target)?;
    df.with_column(Series::new(target.into(), labels))?;
    Ok(df)
}

/// Read the target column as integer class codes
pub fn target_labels(df: &DataFrame, target: &str) -> Result<Vec<i64>> {
    let col = target_column(df, target)?;
    let invalid = |detail: String| {
        PipelineError::Validation(format!(
            "Target column '{}' must hold integer class codes: {}",
            target, detail
        ))
    };

    let values: Vec<Option<i64>> = match col.dtype() {
        dt if dt.is_integer() => col.cast(&DataType::Int64)?.i64()?.into_iter().collect(),
        dt if dt.is_float() => {
            let cast = col.cast(&DataType::Float64)?;
            let mut out = Vec::with_capacity(cast.len());
            for v in cast.f64()?.into_iter() {
                match v {
                    Some(x) if x.is_finite() && x.fract() == 0.0 => out.push(Some(x as i64)),
                    Some(x) => return Err(invalid(format!("found non-integer value {}", x))),
                    None => out.push(None),
                }
            }
            out
        }
        DataType::String => {
            let mut out = Vec::with_capacity(col.len());
            for v in col.str()?.into_iter() {
                match v {
                    Some(s) => match s.trim().parse::<i64>() {
                        Ok(n) => out.push(Some(n)),
                        Err(_) => return Err(invalid(format!("found '{}'", s))),
                    },
                    None => out.push(None),
                }
            }
            out
        }
        other => return Err(invalid(format!("unsupported dtype {}", other))),
    };

    let nulls = values.iter().filter(|v| v.is_none()).count();
    if nulls > 0 {
        return Err(invalid(format!("{} missing value(s)", nulls)));
    }

    Ok(values.into_iter().flatten().collect())
}

/// Row count per class code
pub fn target_class_counts(df: &DataFrame, target: &str) -> Result<BTreeMap<i64, usize>> {
    Ok(class_counts(&target_labels(df, target)?))
}

/// Row count per class code for an already extracted label vector
pub fn class_counts(labels: &[i64]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yes_no() -> BTreeMap<String, i64> {
        BTreeMap::from([("Yes".to_string(), 1), ("No".to_string(), 0)])
    }

    #[test]
    fn test_map_target_trims_and_maps() {
        let df = df! {
            "Churn" => ["Yes", " No", "Yes ", "No"],
            "feature" => [1.0f64, 2.0, 3.0, 4.0],
        }
        .unwrap();

        let df = map_target(df, "Churn", &yes_no()).unwrap();
        let codes: Vec<Option<i64>> = df.column("Churn").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(1), Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_map_target_unmapped_values_fail() {
        let df = df! {
            "Churn" => [Some("Maybe"), Some("No"), Some("Invalid"), None],
        }
        .unwrap();

        let err = map_target(df, "Churn", &yes_no()).unwrap_err();
        match err {
            PipelineError::Mapping { column, examples } => {
                assert_eq!(column, "Churn");
                assert_eq!(
                    examples,
                    vec!["Maybe".to_string(), "Invalid".to_string(), "null".to_string()]
                );
            }
            other => panic!("Expected Mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_map_target_caps_examples() {
        let df = df! {
            "Churn" => ["a", "b", "c", "d", "e", "f", "g"],
        }
        .unwrap();

        match map_target(df, "Churn", &yes_no()).unwrap_err() {
            PipelineError::Mapping { examples, .. } => assert_eq!(examples.len(), 5),
            other => panic!("Expected Mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_map_target_missing_column_is_schema_error() {
        let df = df! {
            "feature" => [1.0f64],
        }
        .unwrap();

        let err = map_target(df, "Churn", &yes_no()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert!(err.to_string().contains("Churn"));
    }

    #[test]
    fn test_target_labels_from_floats() {
        let df = df! {
            "y" => [0.0f64, 1.0, 1.0],
        }
        .unwrap();
        assert_eq!(target_labels(&df, "y").unwrap(), vec![0, 1, 1]);
    }

    #[test]
    fn test_target_labels_rejects_fractions_and_nulls() {
        let df = df! {
            "y" => [0.0f64, 0.5],
        }
        .unwrap();
        assert!(matches!(
            target_labels(&df, "y").unwrap_err(),
            PipelineError::Validation(_)
        ));

        let df = df! {
            "y" => [Some(0i32), None],
        }
        .unwrap();
        assert!(target_labels(&df, "y").unwrap_err().to_string().contains("missing"));
    }

    #[test]
    fn test_ensure_integer_target_parses_strings() {
        let df = df! {
            "y" => ["1", " 0", "1"],
        }
        .unwrap();
        let df = ensure_integer_target(df, "y").unwrap();
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_encode_target_labels_sorts_classes() {
        let df = df! {
            "Churn" => ["Yes", "No", "No", "Yes", "No"],
        }
        .unwrap();

        let (df, classes) = encode_target_labels(df, "Churn").unwrap();
        assert_eq!(classes, Some(vec!["No".to_string(), "Yes".to_string()]));
        assert_eq!(target_labels(&df, "Churn").unwrap(), vec![1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_encode_target_labels_keeps_integer_codes() {
        let df = df! {
            "y" => ["1", "0", "1"],
        }
        .unwrap();

        let (df, classes) = encode_target_labels(df, "y").unwrap();
        assert!(classes.is_none());
        assert_eq!(target_labels(&df, "y").unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn test_encode_target_labels_rejects_nulls() {
        let df = df! {
            "Churn" => [Some("Yes"), None, Some("No")],
        }
        .unwrap();

        let err = encode_target_labels(df, "Churn").unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("1 missing"));
    }

    #[test]
    fn test_decode_labels() {
        let classes = vec!["No".to_string(), "Yes".to_string()];
        assert_eq!(
            decode_labels(&[1, 0, 1], &classes).unwrap(),
            vec!["Yes".to_string(), "No".to_string(), "Yes".to_string()]
        );
        assert!(decode_labels(&[2], &classes).is_err());
        assert!(decode_labels(&[-1], &classes).is_err());
    }

    #[test]
    fn test_class_counts() {
        let counts = class_counts(&[0, 1, 1, 0, 0]);
        assert_eq!(counts.get(&0), Some(&3));
        assert_eq!(counts.get(&1), Some(&2));
    }
}
