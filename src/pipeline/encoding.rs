//! Column-wise encoding and scaling
//!
//! A [`TransformSpec`] names the numeric and categorical columns and the kind
//! of scaler/encoder for each group. Fitting it on the training partition
//! yields a [`FittedTransform`], which is applied by shared reference and
//! therefore can never be refitted by later data.

use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::columns::{
    column_to_string_vec, is_categorical_dtype, is_numeric_dtype, numeric_values,
    validate_columns,
};
use super::matrix::FeatureMatrix;
use crate::artifacts;
use crate::error::Result;

/// Code emitted by the ordinal encoder for categories unseen during fit
pub const UNKNOWN_CATEGORY_CODE: f64 = -1.0;

/// Category suffix used for null values in one-hot feature names
const MISSING_CATEGORY_NAME: &str = "nan";

/// Categorical encoding selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EncodingKind {
    /// One binary column per observed category
    OneHot,
    /// One integer code per category (`label` and `ordinal` both select this)
    Ordinal,
}

impl std::str::FromStr for EncodingKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "onehot" => Ok(EncodingKind::OneHot),
            "label" | "ordinal" => Ok(EncodingKind::Ordinal),
            _ => Err(format!(
                "Unknown encoding kind: '{}'. Use 'onehot', 'label' or 'ordinal'.",
                s
            )),
        }
    }
}

impl TryFrom<String> for EncodingKind {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for EncodingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodingKind::OneHot => write!(f, "onehot"),
            EncodingKind::Ordinal => write!(f, "ordinal"),
        }
    }
}

/// Numeric scaling selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ScalingKind {
    /// Zero mean, unit variance
    Standard,
    /// Rescale to `[0, 1]` using the training range
    MinMax,
}

impl From<String> for ScalingKind {
    fn from(s: String) -> Self {
        if s == "minmax" {
            ScalingKind::MinMax
        } else {
            ScalingKind::Standard
        }
    }
}

impl std::fmt::Display for ScalingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalingKind::Standard => write!(f, "standard"),
            ScalingKind::MinMax => write!(f, "minmax"),
        }
    }
}

/// Learned parameters of a numeric scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedScaler {
    Standard { mean: f64, scale: f64 },
    MinMax { min: f64, scale: f64 },
}

impl FittedScaler {
    /// Fit on the observed values; nulls are ignored.
    ///
    /// A zero spread uses a scale of 1 so constant columns map to 0.
    pub fn fit(kind: ScalingKind, values: &[Option<f64>]) -> Self {
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let n = observed.len() as f64;

        match kind {
            ScalingKind::Standard => {
                if observed.is_empty() {
                    return FittedScaler::Standard {
                        mean: 0.0,
                        scale: 1.0,
                    };
                }
                let mean = observed.iter().sum::<f64>() / n;
                let var = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                FittedScaler::Standard {
                    mean,
                    scale: non_zero_scale(var.sqrt()),
                }
            }
            ScalingKind::MinMax => {
                if observed.is_empty() {
                    return FittedScaler::MinMax {
                        min: 0.0,
                        scale: 1.0,
                    };
                }
                let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
                let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                FittedScaler::MinMax {
                    min,
                    scale: non_zero_scale(max - min),
                }
            }
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            FittedScaler::Standard { mean, scale } => (value - mean) / scale,
            FittedScaler::MinMax { min, scale } => (value - min) / scale,
        }
    }
}

fn non_zero_scale(spread: f64) -> f64 {
    if spread.is_finite() && spread > f64::EPSILON {
        spread
    } else {
        1.0
    }
}

/// Learned categories of a categorical encoder.
///
/// `categories` is sorted; a null category, when seen during fit, sits
/// after all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedEncoder {
    OneHot {
        categories: Vec<String>,
        includes_missing: bool,
    },
    Ordinal {
        categories: Vec<String>,
        includes_missing: bool,
    },
}

impl FittedEncoder {
    pub fn fit(kind: EncodingKind, values: &[Option<String>]) -> Self {
        let mut categories: Vec<String> = values.iter().flatten().cloned().collect();
        categories.sort();
        categories.dedup();
        let includes_missing = values.iter().any(Option::is_none);

        match kind {
            EncodingKind::OneHot => FittedEncoder::OneHot {
                categories,
                includes_missing,
            },
            EncodingKind::Ordinal => FittedEncoder::Ordinal {
                categories,
                includes_missing,
            },
        }
    }

    fn parts(&self) -> (&[String], bool) {
        match self {
            FittedEncoder::OneHot {
                categories,
                includes_missing,
            }
            | FittedEncoder::Ordinal {
                categories,
                includes_missing,
            } => (categories.as_slice(), *includes_missing),
        }
    }

    /// Position of a value among the fitted categories
    pub fn category_index(&self, value: Option<&str>) -> Option<usize> {
        let (categories, includes_missing) = self.parts();
        match value {
            Some(v) => categories.binary_search_by(|c| c.as_str().cmp(v)).ok(),
            None if includes_missing => Some(categories.len()),
            None => None,
        }
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        match self {
            FittedEncoder::OneHot { .. } => {
                let (categories, includes_missing) = self.parts();
                categories.len() + includes_missing as usize
            }
            FittedEncoder::Ordinal { .. } => 1,
        }
    }

    /// Write the encoding of `value` into `out` (length [`Self::width`]).
    ///
    /// Unknown categories become all zeros (one-hot) or
    /// [`UNKNOWN_CATEGORY_CODE`] (ordinal).
    pub fn encode_into(&self, value: Option<&str>, out: &mut [f64]) {
        let index = self.category_index(value);
        match self {
            FittedEncoder::OneHot { .. } => {
                out.iter_mut().for_each(|v| *v = 0.0);
                if let Some(i) = index {
                    out[i] = 1.0;
                }
            }
            FittedEncoder::Ordinal { .. } => {
                out[0] = index.map_or(UNKNOWN_CATEGORY_CODE, |i| i as f64);
            }
        }
    }

    /// Output names for a source column
    pub fn feature_names(&self, column: &str) -> Vec<String> {
        match self {
            FittedEncoder::OneHot { .. } => {
                let (categories, includes_missing) = self.parts();
                let mut names: Vec<String> = categories
                    .iter()
                    .map(|c| format!("{}_{}", column, c))
                    .collect();
                if includes_missing {
                    names.push(format!("{}_{}", column, MISSING_CATEGORY_NAME));
                }
                names
            }
            FittedEncoder::Ordinal { .. } => vec![column.to_string()],
        }
    }
}

/// Columns to transform and how
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub encoding: EncodingKind,
    pub scaling: ScalingKind,
}

impl TransformSpec {
    pub fn new(
        numeric: Vec<String>,
        categorical: Vec<String>,
        encoding: EncodingKind,
        scaling: ScalingKind,
    ) -> Self {
        Self {
            numeric,
            categorical,
            encoding,
            scaling,
        }
    }

    /// Partition the table's columns by dtype, keeping table order.
    ///
    /// Columns that are neither numeric nor categorical are dropped.
    pub fn from_frame(df: &DataFrame, encoding: EncodingKind, scaling: ScalingKind) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if is_numeric_dtype(column.dtype()) {
                numeric.push(name);
            } else if is_categorical_dtype(column.dtype()) {
                categorical.push(name);
            } else {
                warn!(
                    "Dropping column '{}' with unsupported dtype {}",
                    name,
                    column.dtype()
                );
            }
        }

        Self::new(numeric, categorical, encoding, scaling)
    }

    /// Learn scalers and encoders from the training partition
    pub fn fit(&self, train: &DataFrame) -> Result<FittedTransform> {
        let required: Vec<&str> = self
            .numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
            .collect();
        validate_columns(train, &required)?;

        let mut numeric = Vec::with_capacity(self.numeric.len());
        for name in &self.numeric {
            let values = numeric_values(train, name)?;
            numeric.push(NumericColumn {
                name: name.clone(),
                scaler: FittedScaler::fit(self.scaling, &values),
            });
        }

        let mut categorical = Vec::with_capacity(self.categorical.len());
        for name in &self.categorical {
            let values = column_to_string_vec(train.column(name)?)?;
            categorical.push(CategoricalColumn {
                name: name.clone(),
                encoder: FittedEncoder::fit(self.encoding, &values),
            });
        }

        let fitted = FittedTransform {
            numeric,
            categorical,
        };
        info!(
            "Fitted {} numeric and {} categorical columns ({} scaling, {} encoding) -> {} features",
            self.numeric.len(),
            self.categorical.len(),
            self.scaling,
            self.encoding,
            fitted.n_features()
        );
        Ok(fitted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub scaler: FittedScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub encoder: FittedEncoder,
}

/// Scalers and encoders learned from the training partition.
///
/// Output columns are the numeric columns in fit order followed by each
/// categorical column's encoding, also in fit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl FittedTransform {
    /// Total number of output columns
    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.encoder.width())
                .sum::<usize>()
    }

    /// Write as JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::save_preprocessor(path, self)
    }

    /// Read a transformation written by [`FittedTransform::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::load_preprocessor(path)
    }

    /// Output column names, in matrix order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(column.encoder.feature_names(&column.name));
        }
        names
    }

    /// Apply the fitted parameters to a table.
    ///
    /// Extra columns are ignored; a missing fitted column is a validation error.
    /// Null numeric values come out as NaN.
    pub fn transform(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        let required: Vec<&str> = self
            .numeric
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.categorical.iter().map(|c| c.name.as_str()))
            .collect();
        validate_columns(df, &required)?;

        let rows = df.height();
        let cols = self.n_features();
        let mut matrix = FeatureMatrix::zeros(rows, cols);

        for (j, column) in self.numeric.iter().enumerate() {
            let values = numeric_values(df, &column.name)?;
            for (r, v) in values.into_iter().enumerate() {
                matrix.set(r, j, v.map_or(f64::NAN, |x| column.scaler.apply(x)));
            }
        }

        let mut offset = self.numeric.len();
        for column in &self.categorical {
            let width = column.encoder.width();
            let values = column_to_string_vec(df.column(&column.name)?)?;
            for (r, v) in values.iter().enumerate() {
                let row = matrix.row_mut(r);
                column
                    .encoder
                    .encode_into(v.as_deref(), &mut row[offset..offset + width]);
            }
            offset += width;
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn train_frame() -> DataFrame {
        df! {
            "MonthlyCharges" => [10.0f64, 20.0, 30.0, 40.0],
            "Contract" => ["Month-to-month", "One year", "Month-to-month", "Two year"],
        }
        .unwrap()
    }

    #[test]
    fn test_encoding_kind_parsing() {
        assert_eq!("onehot".parse::<EncodingKind>().unwrap(), EncodingKind::OneHot);
        assert_eq!("label".parse::<EncodingKind>().unwrap(), EncodingKind::Ordinal);
        assert_eq!("ordinal".parse::<EncodingKind>().unwrap(), EncodingKind::Ordinal);
        assert!("target".parse::<EncodingKind>().is_err());
        assert!("OneHot".parse::<EncodingKind>().is_err());
    }

    #[test]
    fn test_scaling_kind_defaults_to_standard() {
        assert_eq!(ScalingKind::from("minmax".to_string()), ScalingKind::MinMax);
        assert_eq!(ScalingKind::from("robust".to_string()), ScalingKind::Standard);
        assert_eq!(ScalingKind::from("MinMax".to_string()), ScalingKind::Standard);
        assert_eq!(ScalingKind::from(" minmax".to_string()), ScalingKind::Standard);
    }

    #[test]
    fn test_standard_scaler_population_std() {
        let scaler = FittedScaler::fit(
            ScalingKind::Standard,
            &[Some(1.0), Some(3.0), None],
        );
        assert_eq!(scaler, FittedScaler::Standard { mean: 2.0, scale: 1.0 });
        assert_eq!(scaler.apply(3.0), 1.0);
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let scaler = FittedScaler::fit(ScalingKind::MinMax, &[Some(5.0), Some(5.0)]);
        assert_eq!(scaler.apply(5.0), 0.0);
        let scaler = FittedScaler::fit(ScalingKind::Standard, &[Some(5.0), Some(5.0)]);
        assert_eq!(scaler.apply(5.0), 0.0);
    }

    #[test]
    fn test_onehot_feature_names_and_unknowns() {
        let spec = TransformSpec::from_frame(&train_frame(), EncodingKind::OneHot, ScalingKind::MinMax);
        assert_eq!(spec.numeric, vec!["MonthlyCharges".to_string()]);
        assert_eq!(spec.categorical, vec!["Contract".to_string()]);

        let fitted = spec.fit(&train_frame()).unwrap();
        assert_eq!(
            fitted.feature_names(),
            vec![
                "MonthlyCharges",
                "Contract_Month-to-month",
                "Contract_One year",
                "Contract_Two year",
            ]
        );

        let test = df! {
            "MonthlyCharges" => [25.0f64],
            "Contract" => ["Three year"],
        }
        .unwrap();
        let m = fitted.transform(&test).unwrap();
        assert_eq!(m.row(0), &[0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_ordinal_unknown_is_sentinel() {
        let spec = TransformSpec::from_frame(&train_frame(), EncodingKind::Ordinal, ScalingKind::MinMax);
        let fitted = spec.fit(&train_frame()).unwrap();
        assert_eq!(fitted.feature_names(), vec!["MonthlyCharges", "Contract"]);

        let test = df! {
            "MonthlyCharges" => [10.0f64, 40.0],
            "Contract" => ["Two year", "Lifetime"],
        }
        .unwrap();
        let m = fitted.transform(&test).unwrap();
        assert_eq!(m.row(0), &[0.0, 2.0]);
        assert_eq!(m.row(1), &[1.0, UNKNOWN_CATEGORY_CODE]);
    }

    #[test]
    fn test_null_category_gets_its_own_column() {
        let train = df! {
            "TenureCategory" => [Some("0-12"), None, Some("60+")],
        }
        .unwrap();
        let spec = TransformSpec::from_frame(&train, EncodingKind::OneHot, ScalingKind::Standard);
        let fitted = spec.fit(&train).unwrap();
        assert_eq!(
            fitted.feature_names(),
            vec!["TenureCategory_0-12", "TenureCategory_60+", "TenureCategory_nan"]
        );
        let m = fitted.transform(&train).unwrap();
        assert_eq!(m.row(1), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_transform_missing_column_rejected() {
        let spec = TransformSpec::from_frame(&train_frame(), EncodingKind::OneHot, ScalingKind::Standard);
        let fitted = spec.fit(&train_frame()).unwrap();
        let test = df! {
            "MonthlyCharges" => [1.0f64],
        }
        .unwrap();
        let err = fitted.transform(&test).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("Contract"));
    }

    #[test]
    fn test_null_numeric_becomes_nan() {
        let spec = TransformSpec::new(
            vec!["x".to_string()],
            vec![],
            EncodingKind::OneHot,
            ScalingKind::Standard,
        );
        let train = df! { "x" => [1.0f64, 3.0] }.unwrap();
        let fitted = spec.fit(&train).unwrap();
        let test = df! { "x" => [None::<f64>] }.unwrap();
        assert!(fitted.transform(&test).unwrap().get(0, 0).is_nan());
    }

    #[test]
    fn test_fitted_transform_json_round_trip() {
        let spec = TransformSpec::from_frame(&train_frame(), EncodingKind::OneHot, ScalingKind::Standard);
        let fitted = spec.fit(&train_frame()).unwrap();
        let json = serde_json::to_string(&fitted).unwrap();
        assert!(json.contains("\"kind\":\"one_hot\""));
        let restored: FittedTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fitted);
    }
}
