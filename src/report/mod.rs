//! Report module - summarizing a pipeline run

pub mod metadata;
pub mod summary;

pub use metadata::*;
pub use summary::*;
