//! Pipeline module - the ordered data preparation stages

pub mod binning;
pub mod columns;
pub mod encoding;
pub mod features;
pub mod loader;
pub mod matrix;
pub mod missing;
pub mod runner;
pub mod smote;
pub mod split;
pub mod target;

pub use binning::*;
pub use columns::*;
pub use encoding::*;
pub use features::*;
pub use loader::*;
pub use matrix::FeatureMatrix;
pub use missing::*;
pub use runner::{DataPipeline, Stage, StageEvent};
pub use smote::*;
pub use split::*;
pub use target::*;
