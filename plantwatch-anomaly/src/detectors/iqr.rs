// Plantwatch Anomaly - IQR detector
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

use super::{Detector, Verdict};
use crate::stats;

/// IQR-based anomaly detector.
///
/// Fences sit at `Q1 - k*IQR` and `Q3 + k*IQR`. A row scores the largest
/// distance beyond a fence in IQR units, 0 when every feature is inside.
/// A feature with zero IQR contributes its raw excess instead.
#[derive(Debug, Clone)]
pub struct IqrDetector {
    multiplier: f64,
}

impl IqrDetector {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl Default for IqrDetector {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl Detector for IqrDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        let dims = rows.first().map_or(0, Vec::len);
        let fences: Vec<(f64, f64, f64)> = (0..dims)
            .map(|j| {
                let sorted = stats::sorted(&stats::column(rows, j));
                let q1 = stats::quantile(&sorted, 0.25);
                let q3 = stats::quantile(&sorted, 0.75);
                let iqr = q3 - q1;
                (q1 - self.multiplier * iqr, q3 + self.multiplier * iqr, iqr)
            })
            .collect();

        rows.iter()
            .map(|row| {
                let mut outside = false;
                let mut score = 0.0_f64;
                for (x, (lower, upper, iqr)) in row.iter().zip(&fences) {
                    let excess = if x < lower {
                        lower - x
                    } else if x > upper {
                        x - upper
                    } else {
                        continue;
                    };
                    outside = true;
                    let ratio = if *iqr > 0.0 { excess / iqr } else { excess };
                    score = score.max(ratio);
                }
                Verdict::new(outside, score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_last(x: f64) -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (1..=99).map(|v| vec![f64::from(v)]).collect();
        rows.push(vec![x]);
        rows
    }

    #[test]
    fn test_fence_edges() {
        // Q1 = 25.75, Q3 = 75.25, upper fence = 149.5
        let eps = 1e-6;
        let above = IqrDetector::default().detect(&with_last(149.5 + eps));
        assert!(above[99].is_anomaly);
        assert!(above[..99].iter().all(|v| !v.is_anomaly));

        let below = IqrDetector::default().detect(&with_last(149.5 - eps));
        assert!(!below[99].is_anomaly);
        assert_eq!(below[99].score, 0.0);
    }

    #[test]
    fn test_score_in_iqr_units() {
        let verdicts = IqrDetector::default().detect(&with_last(149.5 + 49.5));
        assert!((verdicts[99].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_iqr() {
        let mut rows = vec![vec![5.0]; 20];
        rows.push(vec![6.0]);
        let verdicts = IqrDetector::default().detect(&rows);
        assert!(verdicts[20].is_anomaly);
        assert!((verdicts[20].score - 1.0).abs() < 1e-12);
        assert!(!verdicts[0].is_anomaly);
        assert_eq!(verdicts[0].score, 0.0);
    }
}
