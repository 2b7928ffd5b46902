//! Pipeline configuration loaded from YAML
//!
//! The file is read and validated once, before any stage runs. Every stage
//! receives the typed section it needs and never sees the raw document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::pipeline::{autopay_regex, EncodingKind, ImputeStrategy, ScalingKind};

/// Config path used when the CLI is run without `--config`
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Root of the configuration document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub preprocessing: PreprocessingConfig,
    pub artifacts: ArtifactPaths,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input file and target definition
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Delimited input file with a header row
    pub file_path: PathBuf,
    /// Column holding the class label
    pub target_column: String,
    /// Columns removed right after loading; absent ones are ignored
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Raw label -> class code. Empty means the target is already coded.
    #[serde(default)]
    pub target_mapping: BTreeMap<String, i64>,
}

/// Parameters for the cleaning, feature and encoding stages
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessingConfig {
    pub missing_value_strategy: ImputeStrategy,
    #[serde(default)]
    pub numeric_to_coerce: Vec<String>,
    pub binning: BinningConfig,
    pub service_columns: Vec<String>,
    pub autopay_keywords: Vec<String>,
    pub test_size: f64,
    pub random_state: u64,
    pub encoding: EncodingKind,
    pub scaling: ScalingKind,
    #[serde(default)]
    pub smote: bool,
}

/// Tenure breakpoints and bucket labels
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinningConfig {
    pub tenure_bins: Vec<f64>,
    pub tenure_labels: Vec<String>,
}

/// Output locations, one per artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactPaths {
    pub x_train: PathBuf,
    pub y_train: PathBuf,
    pub x_test: PathBuf,
    pub y_test: PathBuf,
    pub feature_names: PathBuf,
    pub preprocessor: PathBuf,
    /// Optional JSON run report
    #[serde(default)]
    pub metadata: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Every configured output path, in write order
    pub fn all(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = vec![
            &self.x_train,
            &self.y_train,
            &self.x_test,
            &self.y_test,
            &self.feature_names,
            &self.preprocessor,
        ];
        if let Some(metadata) = &self.metadata {
            paths.push(metadata);
        }
        paths
    }
}

/// Log destination and verbosity
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/pipeline.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Read, parse and validate a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            PipelineError::Config(msg) => {
                PipelineError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.data.target_column.trim().is_empty() {
            return Err(PipelineError::Config(
                "data.target_column must not be empty".to_string(),
            ));
        }
        if self.data.file_path.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "data.file_path must not be empty".to_string(),
            ));
        }

        let prep = &self.preprocessing;
        validate_bins(&prep.binning)?;

        if !(prep.test_size > 0.0 && prep.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "preprocessing.test_size must be between 0 and 1 (exclusive), got {}",
                prep.test_size
            )));
        }

        autopay_regex(&prep.autopay_keywords).map_err(|e| {
            PipelineError::Config(format!("preprocessing.autopay_keywords: {}", e))
        })?;

        for path in self.artifacts.all() {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Config(
                    "artifact paths must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_bins(binning: &BinningConfig) -> Result<()> {
    let edges = &binning.tenure_bins;
    if edges.len() < 2 {
        return Err(PipelineError::Config(format!(
            "preprocessing.binning.tenure_bins needs at least 2 edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| e.is_nan()) {
        return Err(PipelineError::Config(
            "preprocessing.binning.tenure_bins must not contain NaN".to_string(),
        ));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(PipelineError::Config(format!(
            "preprocessing.binning.tenure_bins must be strictly increasing: {:?}",
            edges
        )));
    }
    if binning.tenure_labels.len() != edges.len() - 1 {
        return Err(PipelineError::Config(format!(
            "preprocessing.binning.tenure_labels has {} labels for {} intervals",
            binning.tenure_labels.len(),
            edges.len() - 1
        )));
    }
    Ok(())
}
