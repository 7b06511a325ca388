// Plantwatch Anomaly - Detector implementations
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Detector implementations.
//!
//! Each detector is a pure function of a batch of complete feature rows and
//! returns one [`Verdict`] per row, in row order. Scores are on a
//! method-specific scale.

pub mod dbscan;
pub mod iqr;
pub mod isolation;
pub mod lof;
pub mod multivariate;
pub mod zscore;

pub use dbscan::DbscanDetector;
pub use iqr::IqrDetector;
pub use isolation::IsolationForestDetector;
pub use lof::LofDetector;
pub use multivariate::MahalanobisDetector;
pub use zscore::ZScoreDetector;

/// Per-row detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_anomaly: bool,
    pub score: f64,
}

impl Verdict {
    pub fn new(is_anomaly: bool, score: f64) -> Self {
        Self { is_anomaly, score }
    }
}

/// A batch anomaly detector.
pub trait Detector {
    /// Score every row of `rows`. Rows are equal-length and finite.
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict>;
}

/// Flag rows whose score exceeds the `1 - contamination` quantile.
pub(crate) fn flag_top_fraction(scores: &[f64], contamination: f64, floor: f64) -> Vec<Verdict> {
    let sorted = crate::stats::sorted(scores);
    let cutoff = crate::stats::quantile(&sorted, 1.0 - contamination).max(floor);
    scores
        .iter()
        .map(|&s| Verdict::new(s > cutoff, s))
        .collect()
}
