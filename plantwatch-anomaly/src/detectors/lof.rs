// Plantwatch Anomaly - Local outlier factor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Local outlier factor.
//!
//! `lrd(p) = 1 / mean(reach_dist(p, o))` over the k nearest neighbors o,
//! with `reach_dist(p, o) = max(k_distance(o), d(p, o))`, and
//! `LOF(p) = mean(lrd(o)) / lrd(p)`. Inliers sit near 1.

use super::{flag_top_fraction, Detector, Verdict};
use crate::stats::euclidean;

/// Keeps duplicate points from producing infinite densities.
const DENSITY_EPSILON: f64 = 1e-10;

/// LOF-style anomaly detector.
#[derive(Debug, Clone)]
pub struct LofDetector {
    n_neighbors: usize,
    contamination: f64,
}

impl LofDetector {
    pub fn new(n_neighbors: usize, contamination: f64) -> Self {
        Self {
            n_neighbors,
            contamination,
        }
    }

    /// LOF of every row.
    pub fn factors(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let n = rows.len();
        if n < 2 {
            return vec![1.0; n];
        }
        let k = self.n_neighbors.min(n - 1);

        let neighbors: Vec<Vec<(usize, f64)>> = (0..n)
            .map(|i| {
                let mut dists: Vec<(usize, f64)> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| (j, euclidean(&rows[i], &rows[j])))
                    .collect();
                dists.sort_by(|a, b| a.1.total_cmp(&b.1));
                dists.truncate(k);
                dists
            })
            .collect();

        let k_distance: Vec<f64> = neighbors
            .iter()
            .map(|nb| nb.last().map_or(0.0, |&(_, d)| d))
            .collect();

        let lrd: Vec<f64> = neighbors
            .iter()
            .map(|nb| {
                let reach: f64 = nb.iter().map(|&(j, d)| d.max(k_distance[j])).sum();
                1.0 / (reach / nb.len() as f64 + DENSITY_EPSILON)
            })
            .collect();

        neighbors
            .iter()
            .enumerate()
            .map(|(i, nb)| {
                let mean_lrd = nb.iter().map(|&(j, _)| lrd[j]).sum::<f64>() / nb.len() as f64;
                mean_lrd / lrd[i]
            })
            .collect()
    }
}

impl Default for LofDetector {
    fn default() -> Self {
        Self::new(20, 0.05)
    }
}

impl Detector for LofDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        // A row has to be less dense than its neighbors to be flagged.
        flag_top_fraction(&self.factors(rows), self.contamination, 1.0)
    }
}
