//! Churnprep: Churn Data Preparation Library
//!
//! Loads a customer churn table, cleans and imputes it, engineers features,
//! splits it with stratification, encodes and scales it, optionally
//! rebalances the training set with SMOTE, and saves NumPy-compatible
//! arrays together with the fitted transformation.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::DataPipeline;
