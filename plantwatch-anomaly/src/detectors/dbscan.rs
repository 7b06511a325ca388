// Plantwatch Anomaly - Density clustering
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

use super::{Detector, Verdict};
use crate::stats::euclidean;
use std::collections::VecDeque;

/// DBSCAN-style detector: rows left out of every cluster are anomalies.
///
/// A core row has at least `min_samples` rows, itself included, within
/// `eps`. Scores are 1 for noise and 0 for clustered rows.
#[derive(Debug, Clone)]
pub struct DbscanDetector {
    eps: f64,
    min_samples: usize,
}

impl DbscanDetector {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Cluster label per row, `None` for noise.
    pub fn labels(&self, rows: &[Vec<f64>]) -> Vec<Option<usize>> {
        let n = rows.len();
        let neighborhoods: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| euclidean(&rows[i], &rows[j]) <= self.eps)
                    .collect()
            })
            .collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|nb| nb.len() >= self.min_samples)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut next_cluster = 0;

        for start in 0..n {
            if labels[start].is_some() || !is_core[start] {
                continue;
            }
            let cluster = next_cluster;
            next_cluster += 1;
            labels[start] = Some(cluster);

            let mut queue: VecDeque<usize> = VecDeque::from(vec![start]);
            while let Some(p) = queue.pop_front() {
                if !is_core[p] {
                    continue;
                }
                for &q in &neighborhoods[p] {
                    if labels[q].is_none() {
                        labels[q] = Some(cluster);
                        queue.push_back(q);
                    }
                }
            }
        }

        labels
    }
}

impl Default for DbscanDetector {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl Detector for DbscanDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        self.labels(rows)
            .into_iter()
            .map(|label| match label {
                Some(_) => Verdict::new(false, 0.0),
                None => Verdict::new(true, 1.0),
            })
            .collect()
    }
}
