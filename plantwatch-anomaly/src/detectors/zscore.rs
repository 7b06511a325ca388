// Plantwatch Anomaly - Z-score detector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

use super::{Detector, Verdict};
use crate::stats;

/// Z-Score based anomaly detector.
///
/// A row scores the largest absolute z-score across its features.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    threshold: f64,
}

impl ZScoreDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl Detector for ZScoreDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        let dims = rows.first().map_or(0, Vec::len);
        let moments: Vec<(f64, f64)> = (0..dims)
            .map(|j| {
                let col = stats::column(rows, j);
                (stats::mean(&col), stats::std_dev(&col))
            })
            .collect();

        rows.iter()
            .map(|row| {
                let score = row
                    .iter()
                    .zip(&moments)
                    .map(|(x, (mean, sd))| if *sd > 0.0 { (x - mean).abs() / sd } else { 0.0 })
                    .fold(0.0, f64::max);
                Verdict::new(score > self.threshold, score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_column_scores_zero() {
        let rows = vec![vec![1.0]; 10];
        let verdicts = ZScoreDetector::default().detect(&rows);
        assert!(verdicts.iter().all(|v| v.score == 0.0 && !v.is_anomaly));
    }

    #[test]
    fn test_score_is_max_over_features() {
        let rows = vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![0.0, 100.0], vec![2.0, 0.0]];
        let verdicts = ZScoreDetector::new(1.5).detect(&rows);
        // Column 2 has mean 25 and std 43.3; the spike sits at 1.732.
        assert!((verdicts[2].score - 3f64.sqrt()).abs() < 1e-9);
        assert!(verdicts[2].is_anomaly);
        assert!(!verdicts[1].is_anomaly);
    }
}
