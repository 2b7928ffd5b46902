//! SMOTE oversampling of the encoded training partition

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};

pub const DEFAULT_K_NEIGHBORS: usize = 5;

/// Synthetic minority oversampling.
///
/// Every class other than the majority is grown to the majority count by
/// interpolating between a random member and one of its `k` nearest
/// same-class neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smote {
    pub k_neighbors: usize,
    pub seed: u64,
}

impl Smote {
    pub fn new(seed: u64) -> Self {
        Self {
            k_neighbors: DEFAULT_K_NEIGHBORS,
            seed,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Return the input rows followed by the synthetic rows, grouped by class
    /// in ascending label order.
    pub fn fit_resample(&self, x: &FeatureMatrix, y: &[i64]) -> Result<(FeatureMatrix, Vec<i64>)> {
        if x.rows() != y.len() {
            return Err(PipelineError::Validation(format!(
                "SMOTE got {} feature rows but {} labels",
                x.rows(),
                y.len()
            )));
        }
        if !x.is_finite() {
            return Err(PipelineError::Validation(
                "SMOTE requires a feature matrix without NaN or infinite values".to_string(),
            ));
        }
        if self.k_neighbors == 0 {
            return Err(PipelineError::Validation(
                "SMOTE k_neighbors must be at least 1".to_string(),
            ));
        }

        let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            members.entry(label).or_default().push(i);
        }
        if members.len() < 2 {
            return Err(PipelineError::Validation(format!(
                "SMOTE needs at least two classes, found {}",
                members.len()
            )));
        }

        let majority = members.values().map(Vec::len).max().unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut x_out = x.clone();
        let mut y_out = y.to_vec();
        let mut sample = vec![0.0; x.cols()];

        for (&label, rows) in &members {
            let needed = majority - rows.len();
            if needed == 0 {
                continue;
            }
            if rows.len() <= self.k_neighbors {
                return Err(PipelineError::Validation(format!(
                    "Class {} has {} samples; SMOTE with k_neighbors={} needs more than {}",
                    label,
                    rows.len(),
                    self.k_neighbors,
                    self.k_neighbors
                )));
            }

            let neighbours = nearest_neighbours(x, rows, self.k_neighbors);
            for _ in 0..needed {
                let m = rng.gen_range(0..rows.len());
                let nn = neighbours[m][rng.gen_range(0..self.k_neighbors)];
                let gap: f64 = rng.gen();

                let base = x.row(rows[m]);
                let other = x.row(nn);
                for (s, (&a, &b)) in sample.iter_mut().zip(base.iter().zip(other.iter())) {
                    *s = a + gap * (b - a);
                }
                x_out.push_row(&sample)?;
                y_out.push(label);
            }

            info!(
                "SMOTE added {} synthetic samples to class {} ({} -> {})",
                needed,
                label,
                rows.len(),
                majority
            );
        }

        Ok((x_out, y_out))
    }
}

/// For each row in `rows`, the row indices of its `k` nearest other rows
/// in the same set, closest first.
fn nearest_neighbours(x: &FeatureMatrix, rows: &[usize], k: usize) -> Vec<Vec<usize>> {
    rows.iter()
        .map(|&i| {
            let mut distances: Vec<(f64, usize)> = rows
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (squared_distance(x.row(i), x.row(j)), j))
                .collect();
            distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            distances.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

#[inline]
fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum()
}
