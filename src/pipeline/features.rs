//! Derived churn features
//!
//! Adds a service adoption count, spend per adopted service and two
//! payment-method flags. Input columns are never removed.

use polars::prelude::*;
use regex::{Regex, RegexBuilder};
use tracing::info;

use super::columns::{column_to_string_vec, has_column, numeric_values};
use crate::error::{PipelineError, Result};

pub const SERVICE_SCORE_COLUMN: &str = "ServiceAdoptionScore";
pub const AVG_CHARGES_COLUMN: &str = "AvgChargesPerService";
pub const ELECTRONIC_CHECK_COLUMN: &str = "IsElectronicCheck";
pub const AUTOPAY_COLUMN: &str = "IsAutoPay";

/// Monthly spend column divided by the adoption score
pub const MONTHLY_CHARGES_COLUMN: &str = "MonthlyCharges";

/// Payment method column used by both payment flags
pub const PAYMENT_METHOD_COLUMN: &str = "PaymentMethod";

const ELECTRONIC_CHECK: &str = "Electronic check";
const SERVICE_ADOPTED: &str = "Yes";
const SERVICE_MISSING_FILL: &str = "No";

/// Case-insensitive alternation of the autopay keywords.
///
/// Keywords are joined verbatim, so they may carry regex syntax.
pub fn autopay_regex(keywords: &[String]) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(&keywords.join("|"))
        .case_insensitive(true)
        .build()
}

/// Add the engineered columns.
///
/// Service columns missing from the table are created filled with "No".
pub fn add_features(
    mut df: DataFrame,
    service_columns: &[String],
    autopay_keywords: &[String],
) -> Result<DataFrame> {
    let height = df.height();

    for col in service_columns {
        if !has_column(&df, col) {
            info!("Service column '{}' missing, filling with '{}'", col, SERVICE_MISSING_FILL);
            df.with_column(Series::new(
                col.as_str().into(),
                vec![SERVICE_MISSING_FILL; height],
            ))?;
        }
    }

    let mut score = vec![0i64; height];
    for col in service_columns {
        let values = column_to_string_vec(df.column(col)?)?;
        for (row, value) in values.iter().enumerate() {
            if value.as_deref() == Some(SERVICE_ADOPTED) {
                score[row] += 1;
            }
        }
    }

    let per_service: Option<Vec<Option<f64>>> = if has_column(&df, MONTHLY_CHARGES_COLUMN) {
        let charges = numeric_values(&df, MONTHLY_CHARGES_COLUMN)?;
        Some(
            charges
                .iter()
                .zip(score.iter())
                .map(|(c, &s)| c.map(|c| c / s.max(1) as f64))
                .collect(),
        )
    } else {
        None
    };

    df.with_column(Series::new(SERVICE_SCORE_COLUMN.into(), score))?;
    if let Some(per_service) = per_service {
        df.with_column(Series::new(AVG_CHARGES_COLUMN.into(), per_service))?;
    }

    if has_column(&df, PAYMENT_METHOD_COLUMN) {
        let methods = column_to_string_vec(df.column(PAYMENT_METHOD_COLUMN)?)?;
        let pattern = autopay_regex(autopay_keywords)
            .map_err(|e| PipelineError::Config(format!("autopay keywords: {}", e)))?;

        let electronic: Vec<i64> = methods
            .iter()
            .map(|m| (m.as_deref() == Some(ELECTRONIC_CHECK)) as i64)
            .collect();
        let autopay: Vec<i64> = methods
            .iter()
            .map(|m| m.as_deref().is_some_and(|s| pattern.is_match(s)) as i64)
            .collect();

        df.with_column(Series::new(ELECTRONIC_CHECK_COLUMN.into(), electronic))?;
        df.with_column(Series::new(AUTOPAY_COLUMN.into(), autopay))?;
    }

    info!("Engineered features added; table now has {} columns", df.width());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["automatic".to_string(), "bank transfer".to_string()]
    }

    #[test]
    fn test_autopay_regex_case_insensitive() {
        let re = autopay_regex(&keywords()).unwrap();
        assert!(re.is_match("Bank transfer (automatic)"));
        assert!(re.is_match("Credit card (AUTOMATIC)"));
        assert!(!re.is_match("Mailed check"));
    }

    #[test]
    fn test_zero_score_does_not_divide_by_zero() {
        let df = df! {
            "OnlineSecurity" => ["No", "Yes"],
            "MonthlyCharges" => [50.0f64, 80.0],
        }
        .unwrap();

        let df = add_features(df, &["OnlineSecurity".to_string()], &keywords()).unwrap();
        let avg: Vec<Option<f64>> = df
            .column(AVG_CHARGES_COLUMN)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(avg, vec![Some(50.0), Some(80.0)]);
    }

    #[test]
    fn test_missing_service_column_synthesized() {
        let df = df! {
            "OnlineSecurity" => ["Yes", "Yes"],
        }
        .unwrap();

        let services = vec!["OnlineSecurity".to_string(), "TechSupport".to_string()];
        let df = add_features(df, &services, &keywords()).unwrap();

        let filled: Vec<Option<&str>> = df
            .column("TechSupport")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(filled, vec![Some("No"), Some("No")]);

        let score: Vec<Option<i64>> = df
            .column(SERVICE_SCORE_COLUMN)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(score, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_non_numeric_charges_rejected() {
        let df = df! {
            "MonthlyCharges" => ["cheap", "dear"],
        }
        .unwrap();

        assert!(add_features(df, &[], &keywords()).is_err());
    }
}
