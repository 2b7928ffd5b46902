//! Artifact module - NumPy arrays and JSON written at the end of a run

pub mod npy;
pub mod saver;

pub use npy::{NpyArray, NpyData};
pub use saver::*;
