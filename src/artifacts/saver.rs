//! Writers and readers for the pipeline artifacts
//!
//! Every writer creates missing parent directories. Writes are independent;
//! a failure part-way through leaves earlier files in place.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::npy::NpyArray;
use crate::config::ArtifactPaths;
use crate::error::{PipelineError, Result};
use crate::pipeline::{decode_labels, FeatureMatrix, FittedTransform};
use crate::report::RunMetadata;

/// Member name `np.savez` gives a single positional array
pub const NPZ_MEMBER: &str = "arr_0.npy";

/// Create the parent directory of `path` if it has one
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    Ok(())
}

fn create_file(path: &Path) -> Result<File> {
    ensure_parent_dir(path)?;
    File::create(path).map_err(|e| PipelineError::io(path, e))
}

fn zip_error(path: &Path, e: zip::result::ZipError) -> PipelineError {
    PipelineError::Serialization(format!("{}: {}", path.display(), e))
}

/// Write a single array as an uncompressed `.npz` archive
pub fn save_npz(path: impl AsRef<Path>, array: &NpyArray) -> Result<()> {
    let path = path.as_ref();
    let bytes = array.to_npy_bytes()?;

    let mut zip = ZipWriter::new(create_file(path)?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file(NPZ_MEMBER, options)
        .map_err(|e| zip_error(path, e))?;
    zip.write_all(&bytes).map_err(|e| PipelineError::io(path, e))?;
    zip.finish().map_err(|e| zip_error(path, e))?;

    info!("Saved {:?} array to {}", array.shape, path.display());
    Ok(())
}

/// Read the array written by [`save_npz`]
pub fn load_npz(path: impl AsRef<Path>) -> Result<NpyArray> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(path, e))?;
    let mut member = archive
        .by_name(NPZ_MEMBER)
        .map_err(|e| zip_error(path, e))?;

    let mut bytes = Vec::new();
    member
        .read_to_end(&mut bytes)
        .map_err(|e| PipelineError::io(path, e))?;
    NpyArray::from_npy_bytes(&bytes)
}

pub fn save_npy(path: impl AsRef<Path>, array: &NpyArray) -> Result<()> {
    let path = path.as_ref();
    let bytes = array.to_npy_bytes()?;
    let mut file = create_file(path)?;
    file.write_all(&bytes).map_err(|e| PipelineError::io(path, e))?;
    info!("Saved {:?} array to {}", array.shape, path.display());
    Ok(())
}

pub fn load_npy(path: impl AsRef<Path>) -> Result<NpyArray> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    NpyArray::from_npy_bytes(&bytes)
}

/// Pretty-printed JSON
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Serialization(e.to_string()))?;
    ensure_parent_dir(path)?;
    std::fs::write(path, json).map_err(|e| PipelineError::io(path, e))
}

pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| PipelineError::Serialization(format!("{}: {}", path.display(), e)))
}

pub fn save_preprocessor(path: impl AsRef<Path>, transform: &FittedTransform) -> Result<()> {
    let path = path.as_ref();
    save_json(path, transform)?;
    info!("Saved fitted preprocessor to {}", path.display());
    Ok(())
}

pub fn load_preprocessor(path: impl AsRef<Path>) -> Result<FittedTransform> {
    load_json(path)
}

pub fn save_metadata(path: impl AsRef<Path>, metadata: &RunMetadata) -> Result<()> {
    let path = path.as_ref();
    save_json(path, metadata)?;
    info!("Saved run metadata to {}", path.display());
    Ok(())
}

/// Everything a run persists
pub struct ArtifactSet<'a> {
    pub x_train: &'a FeatureMatrix,
    pub y_train: &'a [i64],
    pub x_test: &'a FeatureMatrix,
    pub y_test: &'a [i64],
    /// Labels behind the class codes when the target was textual
    pub target_classes: Option<&'a [String]>,
    pub feature_names: &'a [String],
    pub preprocessor: &'a FittedTransform,
    pub metadata: Option<&'a RunMetadata>,
}

/// Write every artifact to its configured path.
///
/// Metadata is only written when both a path and a report are present.
pub fn save_all(paths: &ArtifactPaths, set: &ArtifactSet<'_>) -> Result<()> {
    save_npz(&paths.x_train, &NpyArray::from_matrix(set.x_train))?;
    save_npz(&paths.y_train, &label_array(set.y_train, set.target_classes)?)?;
    save_npz(&paths.x_test, &NpyArray::from_matrix(set.x_test))?;
    save_npz(&paths.y_test, &label_array(set.y_test, set.target_classes)?)?;
    save_npy(&paths.feature_names, &NpyArray::from_strings(set.feature_names))?;
    save_preprocessor(&paths.preprocessor, set.preprocessor)?;

    if let (Some(path), Some(metadata)) = (&paths.metadata, set.metadata) {
        save_metadata(path, metadata)?;
    }
    Ok(())
}

/// Class names when the target was textual, integer codes otherwise
fn label_array(labels: &[i64], classes: Option<&[String]>) -> Result<NpyArray> {
    Ok(match classes {
        Some(classes) => NpyArray::from_strings(&decode_labels(labels, classes)?),
        None => NpyArray::from_labels(labels),
    })
}
