//! Tests for dataset loading and column dropping

use churnprep::pipeline::{drop_columns, load_dataset, missing_value_counts};
use churnprep::PipelineError;
use polars::prelude::*;
use std::path::Path;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_load_csv_shape() {
    let (_dir, csv_path) = common::create_temp_churn_csv();

    let df = load_dataset(&csv_path).unwrap();

    assert_eq!(df.height(), 40, "Should load every row");
    assert_eq!(df.width(), 11, "Should load every column");
    assert!(df.column("Churn").is_ok());
}

#[test]
fn test_load_tsv_uses_tab_separator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.tsv");
    std::fs::write(&path, "a\tb\n1\tx\n2\ty\n").unwrap();

    let df = load_dataset(&path).unwrap();

    assert_eq!(df.width(), 2);
    assert_eq!(df.height(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_dataset(Path::new("/nonexistent/churn.csv")).unwrap_err();

    assert!(
        matches!(err, PipelineError::Io { .. }),
        "Missing file should be an I/O error, got {err:?}"
    );
    assert!(err.to_string().contains("churn.csv"));
}

#[test]
fn test_any_extension_reads_as_comma_separated() {
    let (dir, csv_path) = common::create_temp_churn_csv();
    let data_path = dir.path().join("churn.data");
    std::fs::copy(&csv_path, &data_path).unwrap();
    let bare_path = dir.path().join("churn");
    std::fs::copy(&csv_path, &bare_path).unwrap();

    let expected = load_dataset(&csv_path).unwrap();
    let from_data = load_dataset(&data_path).unwrap();
    let from_bare = load_dataset(&bare_path).unwrap();

    assert_eq!(from_data.shape(), (40, 11));
    assert!(from_data.equals_missing(&expected));
    assert!(from_bare.equals_missing(&expected));
}

#[test]
fn test_drop_columns_after_load() {
    let (_dir, csv_path) = common::create_temp_churn_csv();
    let df = load_dataset(&csv_path).unwrap();

    let (df, dropped) = drop_columns(
        df,
        &["customerID".to_string(), "NotAColumn".to_string()],
    )
    .unwrap();

    assert_eq!(dropped, vec!["customerID".to_string()]);
    assert_eq!(df.width(), 10);
    assert!(df.column("customerID").is_err());
}

#[test]
fn test_missing_value_counts_sorted() {
    let df = df! {
        "a" => [Some(1.0f64), None, None],
        "b" => [Some(1.0f64), None, Some(3.0)],
        "c" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();

    let counts = missing_value_counts(&df);

    assert_eq!(
        counts,
        vec![("a".to_string(), 2), ("b".to_string(), 1)],
        "Complete columns should be omitted and the rest sorted descending"
    );
}
