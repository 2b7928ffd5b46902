//! Stratified train/test splitting
//!
//! Class proportions in both partitions follow the full table as closely as
//! the partition sizes allow. The split is fully determined by the seed.

use std::collections::BTreeMap;

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::target::target_labels;
use crate::error::{PipelineError, Result};

/// Row positions of each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Feature tables and labels of both partitions
#[derive(Debug, Clone)]
pub struct SplitData {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: Vec<i64>,
    pub y_test: Vec<i64>,
}

/// Split label positions into stratified train/test partitions.
///
/// `n_test = ceil(test_size * n)`. Fails when `test_size` is outside
/// `(0, 1)`, a class has fewer than 2 members, or either partition would be
/// smaller than the number of classes.
pub fn stratified_split(labels: &[i64], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::Split(format!(
            "test_size must be between 0 and 1 (exclusive), got {}",
            test_size
        )));
    }

    let n = labels.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_train == 0 || n_test == 0 {
        return Err(PipelineError::Split(format!(
            "With n_samples={} and test_size={}, the resulting train set would be empty",
            n, test_size
        )));
    }

    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(i);
    }

    if let Some((class, rows)) = members.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::Split(format!(
            "The least populated class in y ({}) has only {} member, which is too few. \
             The minimum number of groups for any class cannot be less than 2.",
            class,
            rows.len()
        )));
    }

    let n_classes = members.len();
    if n_train < n_classes || n_test < n_classes {
        return Err(PipelineError::Split(format!(
            "The train_size = {} and test_size = {} should each be greater or equal \
             to the number of classes = {}",
            n_train, n_test, n_classes
        )));
    }

    let counts: Vec<usize> = members.values().map(Vec::len).collect();
    let train_counts = approximate_mode(&counts, n_train);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for (rows, &take) in members.values().zip(train_counts.iter()) {
        let mut shuffled = rows.clone();
        shuffled.shuffle(&mut rng);
        let (train_rows, test_rows) = shuffled.split_at(take);
        train.extend_from_slice(train_rows);
        test.extend_from_slice(test_rows);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Allocate `draws` across classes proportionally to `counts`.
///
/// Floors the exact shares, then hands the remaining draws to the classes
/// with the largest fractional parts (earlier classes win ties).
pub fn approximate_mode(counts: &[usize], draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * draws as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = draws.saturating_sub(alloc.iter().sum());
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for &i in order.iter().cycle().take(counts.len() * 2) {
        if remaining == 0 {
            break;
        }
        if alloc[i] < counts[i] {
            alloc[i] += 1;
            remaining -= 1;
        }
    }

    alloc
}

/// Separate the target from the features and split both.
pub fn split_frame(df: &DataFrame, target: &str, test_size: f64, seed: u64) -> Result<SplitData> {
    let labels = target_labels(df, target)?;
    let indices = stratified_split(&labels, test_size, seed)?;

    let features = df.drop(target)?;
    let x_train = take_rows(&features, &indices.train)?;
    let x_test = take_rows(&features, &indices.test)?;
    let y_train: Vec<i64> = indices.train.iter().map(|&i| labels[i]).collect();
    let y_test: Vec<i64> = indices.test.iter().map(|&i| labels[i]).collect();

    info!(
        "Split {} rows into {} train / {} test (test_size={}, seed={})",
        labels.len(),
        y_train.len(),
        y_test.len(),
        test_size,
        seed
    );

    Ok(SplitData {
        x_train,
        x_test,
        y_train,
        y_test,
    })
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::target::class_counts;

    fn imbalanced_labels() -> Vec<i64> {
        let mut labels = vec![0i64; 900];
        labels.extend(vec![1i64; 100]);
        labels
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let labels = imbalanced_labels();
        let split = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(split.train.len(), 800);
        assert_eq!(split.test.len(), 200);

        let test_labels: Vec<i64> = split.test.iter().map(|&i| labels[i]).collect();
        let train_labels: Vec<i64> = split.train.iter().map(|&i| labels[i]).collect();
        assert_eq!(class_counts(&test_labels).get(&1), Some(&20));
        assert_eq!(class_counts(&train_labels).get(&1), Some(&80));
    }

    #[test]
    fn test_split_is_partition() {
        let labels = imbalanced_labels();
        let split = stratified_split(&labels, 0.25, 7).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..labels.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_deterministic_per_seed() {
        let labels = imbalanced_labels();
        let a = stratified_split(&labels, 0.2, 42).unwrap();
        let b = stratified_split(&labels, 0.2, 42).unwrap();
        let c = stratified_split(&labels, 0.2, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_singleton_class_infeasible() {
        let labels = vec![0, 0, 0, 0, 1];
        let err = stratified_split(&labels, 0.2, 0).unwrap_err();
        assert!(matches!(err, PipelineError::Split(_)));
    }

    #[test]
    fn test_partition_smaller_than_class_count_infeasible() {
        let labels = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        // ceil(0.1 * 10) = 1 test row for 2 classes
        let err = stratified_split(&labels, 0.1, 0).unwrap_err();
        assert!(err.to_string().contains("number of classes"));
    }

    #[test]
    fn test_approximate_mode_distributes_remainder() {
        assert_eq!(approximate_mode(&[900, 100], 800), vec![720, 80]);
        assert_eq!(approximate_mode(&[5, 5, 5], 7).iter().sum::<usize>(), 7);
        assert_eq!(approximate_mode(&[3, 1], 2), vec![2, 0]);
    }

    #[test]
    fn test_split_frame_drops_target() {
        let df = df! {
            "x" => (0..20).map(|v| v as f64).collect::<Vec<_>>(),
            "y" => (0..20).map(|v| (v % 2) as i64).collect::<Vec<_>>(),
        }
        .unwrap();

        let split = split_frame(&df, "y", 0.2, 1).unwrap();
        assert_eq!(split.x_train.height(), 16);
        assert_eq!(split.x_test.height(), 4);
        assert_eq!(split.x_train.width(), 1);
        assert_eq!(split.y_test.iter().filter(|&&v| v == 1).count(), 2);
    }
}
