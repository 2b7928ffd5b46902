//! End-to-end pipeline execution
//!
//! Stages run strictly in order: load, clean, bin, engineer, split, encode,
//! resample, save. Artifacts are only touched by the last stage, so a failure
//! anywhere earlier leaves nothing on disk.

use std::time::{Duration, Instant};

use tracing::{error, info, info_span, warn};

use super::binning::{add_bucket_column, TENURE_CATEGORY_COLUMN, TENURE_COLUMN};
use super::encoding::{FittedTransform, TransformSpec};
use super::features::add_features;
use super::loader::{drop_columns, load_dataset, missing_value_counts};
use super::matrix::FeatureMatrix;
use super::missing::coerce_and_impute;
use super::smote::Smote;
use super::split::split_frame;
use super::target::{class_counts, encode_target_labels, map_target, target_class_counts};
use crate::artifacts::{save_all, ArtifactSet};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::report::{RunMetadata, RunSummary};

/// A pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Bin,
    Engineer,
    Split,
    Encode,
    Resample,
    Save,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Load,
        Stage::Clean,
        Stage::Bin,
        Stage::Engineer,
        Stage::Split,
        Stage::Encode,
        Stage::Resample,
        Stage::Save,
    ];

    /// 1-based position in the run
    pub fn number(self) -> u8 {
        Stage::ALL.iter().position(|s| *s == self).map_or(0, |i| i as u8 + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Bin => "bin",
            Stage::Engineer => "engineer",
            Stage::Split => "split",
            Stage::Encode => "encode",
            Stage::Resample => "resample",
            Stage::Save => "save",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Load => "Loading Dataset",
            Stage::Clean => "Coercing & Imputing",
            Stage::Bin => "Binning Tenure",
            Stage::Engineer => "Engineering Features",
            Stage::Split => "Stratified Split",
            Stage::Encode => "Encoding & Scaling",
            Stage::Resample => "SMOTE Resampling",
            Stage::Save => "Saving Artifacts",
        }
    }
}

/// Progress notifications emitted while the pipeline runs
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Started(Stage),
    Finished(Stage, Duration),
    Skipped(Stage),
    Failed(Stage),
}

/// Encoded partitions ready to be saved
struct Encoded {
    transform: FittedTransform,
    x_train: FeatureMatrix,
    x_test: FeatureMatrix,
    y_train: Vec<i64>,
    y_test: Vec<i64>,
}

/// Runs every stage against one validated configuration
pub struct DataPipeline {
    config: PipelineConfig,
}

impl DataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunSummary> {
        self.run_with(|_| {})
    }

    /// Run the pipeline, reporting stage progress to `on_event`
    pub fn run_with<F: FnMut(StageEvent)>(&self, mut on_event: F) -> Result<RunSummary> {
        let data = &self.config.data;
        let prep = &self.config.preprocessing;
        let target = data.target_column.as_str();
        let mut summary = RunSummary::new(&data.file_path);

        info!("Starting data pipeline for {}", data.file_path.display());

        let df = timed(Stage::Load, &mut summary, &mut on_event, |summary| {
            let df = load_dataset(&data.file_path)?;
            summary.rows_loaded = df.height();
            summary.columns_loaded = df.width();

            for (column, missing) in missing_value_counts(&df) {
                info!("Column '{}' has {} missing values", column, missing);
            }

            let (df, dropped) = drop_columns(df, &data.drop_columns)?;
            summary.dropped_columns = dropped;

            let df = if data.target_mapping.is_empty() {
                let (df, classes) = encode_target_labels(df, target)?;
                summary.target_classes = classes;
                df
            } else {
                map_target(df, target, &data.target_mapping)?
            };
            summary.class_counts = target_class_counts(&df, target)?;
            Ok(df)
        })?;

        let df = timed(Stage::Clean, &mut summary, &mut on_event, |summary| {
            let (df, records) =
                coerce_and_impute(df, prep.missing_value_strategy, &prep.numeric_to_coerce)?;
            summary.imputations = records;
            Ok(df)
        })?;

        let df = timed(Stage::Bin, &mut summary, &mut on_event, |_| {
            add_bucket_column(
                df,
                TENURE_COLUMN,
                TENURE_CATEGORY_COLUMN,
                &prep.binning.tenure_bins,
                &prep.binning.tenure_labels,
            )
        })?;

        let df = timed(Stage::Engineer, &mut summary, &mut on_event, |_| {
            add_features(df, &prep.service_columns, &prep.autopay_keywords)
        })?;

        let split = timed(Stage::Split, &mut summary, &mut on_event, |summary| {
            let split = split_frame(&df, target, prep.test_size, prep.random_state)?;
            summary.train_rows = split.y_train.len();
            summary.test_rows = split.y_test.len();
            Ok(split)
        })?;
        drop(df);

        let encoded = timed(Stage::Encode, &mut summary, &mut on_event, |summary| {
            let spec = TransformSpec::from_frame(&split.x_train, prep.encoding, prep.scaling);
            let transform = spec.fit(&split.x_train)?;
            let x_train = transform.transform(&split.x_train)?;
            let x_test = transform.transform(&split.x_test)?;
            warn_non_finite(&x_train, "training");
            warn_non_finite(&x_test, "test");
            summary.n_features = transform.n_features();
            Ok(Encoded {
                transform,
                x_train,
                x_test,
                y_train: split.y_train,
                y_test: split.y_test,
            })
        })?;

        let encoded = if prep.smote {
            timed(Stage::Resample, &mut summary, &mut on_event, |summary| {
                let (x_train, y_train) = Smote::new(prep.random_state)
                    .fit_resample(&encoded.x_train, &encoded.y_train)?;
                summary.resampled_train_rows = Some(y_train.len());
                Ok(Encoded {
                    x_train,
                    y_train,
                    ..encoded
                })
            })?
        } else {
            on_event(StageEvent::Skipped(Stage::Resample));
            encoded
        };
        summary.train_class_counts = class_counts(&encoded.y_train);

        timed(Stage::Save, &mut summary, &mut on_event, |summary| {
            let paths = &self.config.artifacts;
            let metadata = paths
                .metadata
                .as_ref()
                .map(|_| RunMetadata::new(&self.config, summary));
            let feature_names = encoded.transform.feature_names();

            save_all(
                paths,
                &ArtifactSet {
                    x_train: &encoded.x_train,
                    y_train: &encoded.y_train,
                    x_test: &encoded.x_test,
                    y_test: &encoded.y_test,
                    target_classes: summary.target_classes.as_deref(),
                    feature_names: &feature_names,
                    preprocessor: &encoded.transform,
                    metadata: metadata.as_ref(),
                },
            )?;
            summary.artifacts = paths.all().into_iter().map(|p| p.to_path_buf()).collect();
            Ok(())
        })?;

        info!(
            "Data pipeline executed successfully in {:.2}s",
            summary.total_elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

/// Time a stage inside its own span and record it on success
fn timed<T, F>(
    stage: Stage,
    summary: &mut RunSummary,
    on_event: &mut impl FnMut(StageEvent),
    body: F,
) -> Result<T>
where
    F: FnOnce(&mut RunSummary) -> Result<T>,
{
    on_event(StageEvent::Started(stage));
    let span = info_span!("stage", name = stage.name());
    let _guard = span.enter();

    let start = Instant::now();
    let result = body(summary);
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => {
            info!("Stage '{}' finished in {:.3}s", stage.name(), elapsed.as_secs_f64());
            summary.record_stage(stage.name(), elapsed);
            on_event(StageEvent::Finished(stage, elapsed));
        }
        Err(e) => {
            error!("Stage '{}' failed: {}", stage.name(), e);
            on_event(StageEvent::Failed(stage));
        }
    }
    result
}

/// Nulls left in numeric columns survive encoding as NaN
fn warn_non_finite(matrix: &FeatureMatrix, partition: &str) -> usize {
    let bad = matrix.as_slice().iter().filter(|v| !v.is_finite()).count();
    if bad > 0 {
        warn!(
            "{} missing or non-finite values in the encoded {} features",
            bad, partition
        );
    }
    bad
}
