// Plantwatch Anomaly - Isolation forest
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Isolation forest.
//!
//! Each tree partitions a random subsample with random axis-aligned splits
//! until points are isolated or the height limit `ceil(log2(psi))` is hit.
//! A row scores `2^(-E[h(x)] / c(psi))`: values near 1 isolate quickly.

use super::{flag_top_fraction, Detector, Verdict};
use rand::prelude::*;
use rand::rngs::StdRng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average unsuccessful-search path length in a binary search tree of `n`.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: usize,
        right: usize,
    },
}

/// One isolation tree stored as an arena.
#[derive(Debug)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(rows: &[Vec<f64>], sample: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, sample, 0, height_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        members: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        if members.len() <= 1 || depth >= height_limit {
            self.nodes.push(Node::Leaf {
                size: members.len(),
            });
            return id;
        }

        // Only features that still vary inside this node can split it.
        let dims = rows[members[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..dims)
            .filter_map(|j| {
                let (lo, hi) = members.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(rows[i][j]), hi.max(rows[i][j]))
                });
                (hi > lo).then_some((j, lo, hi))
            })
            .collect();

        let Some(&(feature, lo, hi)) = candidates.choose(rng) else {
            self.nodes.push(Node::Leaf {
                size: members.len(),
            });
            return id;
        };

        let value = rng.gen_range(lo..hi);
        let (left_members, right_members): (Vec<usize>, Vec<usize>) =
            members.into_iter().partition(|&i| rows[i][feature] < value);

        self.nodes.push(Node::Leaf { size: 0 });
        let left = self.grow(rows, left_members, depth + 1, height_limit, rng);
        let right = self.grow(rows, right_members, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            value,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    value,
                    left,
                    right,
                } => {
                    id = if row[*feature] < *value { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Isolation-forest anomaly detector.
#[derive(Debug, Clone)]
pub struct IsolationForestDetector {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForestDetector {
    pub fn new(n_estimators: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples,
            contamination,
            seed,
        }
    }

    /// Isolation scores in `(0, 1]` for every row.
    pub fn scores(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        let psi = self.max_samples.min(rows.len()).max(1);
        let height_limit = (psi as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let indices: Vec<usize> = (0..rows.len()).collect();
        let forest: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = indices.choose_multiple(&mut rng, psi).copied().collect();
                IsolationTree::build(rows, sample, height_limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(psi);
        rows.iter()
            .map(|row| {
                let mean_path =
                    forest.iter().map(|t| t.path_length(row)).sum::<f64>() / forest.len() as f64;
                if normalizer > 0.0 {
                    2f64.powf(-mean_path / normalizer)
                } else {
                    0.5
                }
            })
            .collect()
    }
}

impl Default for IsolationForestDetector {
    fn default() -> Self {
        Self::new(100, 256, 0.05, 42)
    }
}

impl Detector for IsolationForestDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        flag_top_fraction(&self.scores(rows), self.contamination, f64::NEG_INFINITY)
    }
}
