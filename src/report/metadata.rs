//! JSON run report written next to the arrays

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::summary::RunSummary;
use crate::config::PipelineConfig;
use crate::pipeline::ImputationRecord;

/// Metadata about a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Timestamp of the run (RFC 3339)
    pub timestamp: String,
    /// Churnprep version
    pub churnprep_version: String,
    pub input_file: String,
    pub target_column: String,
    pub rows_loaded: usize,
    pub dropped_columns: Vec<String>,
    pub imputations: Vec<ImputationRecord>,
    /// Label of each target code, in code order, when the target was textual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_classes: Option<Vec<String>>,
    /// Target code -> rows, before splitting
    pub class_counts: BTreeMap<i64, usize>,
    pub x_train_shape: [usize; 2],
    pub x_test_shape: [usize; 2],
    /// Target code -> rows in the saved training labels
    pub train_class_counts: BTreeMap<i64, usize>,
    pub n_features: usize,
    pub encoding: String,
    pub scaling: String,
    pub missing_value_strategy: String,
    pub test_size: f64,
    pub random_state: u64,
    pub smote: bool,
}

impl RunMetadata {
    pub fn new(config: &PipelineConfig, summary: &RunSummary) -> Self {
        let train_rows = summary.resampled_train_rows.unwrap_or(summary.train_rows);
        let prep = &config.preprocessing;

        Self {
            timestamp: Utc::now().to_rfc3339(),
            churnprep_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: config.data.file_path.display().to_string(),
            target_column: config.data.target_column.clone(),
            rows_loaded: summary.rows_loaded,
            dropped_columns: summary.dropped_columns.clone(),
            imputations: summary.imputations.clone(),
            target_classes: summary.target_classes.clone(),
            class_counts: summary.class_counts.clone(),
            x_train_shape: [train_rows, summary.n_features],
            x_test_shape: [summary.test_rows, summary.n_features],
            train_class_counts: summary.train_class_counts.clone(),
            n_features: summary.n_features,
            encoding: prep.encoding.to_string(),
            scaling: prep.scaling.to_string(),
            missing_value_strategy: prep.missing_value_strategy.to_string(),
            test_size: prep.test_size,
            random_state: prep.random_state,
            smote: prep.smote,
        }
    }
}
