// Plantwatch Anomaly - Mahalanobis distance
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Multivariate detector.
//!
//! Distance from the batch centroid under the batch covariance:
//! `D(x) = sqrt((x - mu)^T * S^-1 * (x - mu))` with
//! `S = cov + epsilon * I`.

use super::{Detector, Verdict};
use log::warn;
use nalgebra::{DMatrix, DVector};

/// Mahalanobis-distance anomaly detector.
#[derive(Debug, Clone)]
pub struct MahalanobisDetector {
    critical_distance: f64,
    covariance_epsilon: f64,
}

impl MahalanobisDetector {
    pub fn new(critical_distance: f64, covariance_epsilon: f64) -> Self {
        Self {
            critical_distance,
            covariance_epsilon,
        }
    }

    /// Distance of every row from the centroid.
    pub fn distances(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let n = rows.len();
        let d = rows.first().map_or(0, Vec::len);
        if n == 0 || d == 0 {
            return vec![0.0; n];
        }

        let means: DVector<f64> = DVector::from_iterator(
            d,
            (0..d).map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64),
        );

        // Centered data matrix (samples x features)
        let centered = DMatrix::<f64>::from_fn(n, d, |i, j| rows[i][j] - means[j]);

        // Covariance = (1/(n-1)) * X^T * X, regularized
        let cov = centered.transpose() * &centered / (n.saturating_sub(1).max(1)) as f64;
        let cov_reg = &cov + DMatrix::<f64>::identity(d, d) * self.covariance_epsilon;

        let precision = match cov_reg.clone().try_inverse() {
            Some(inv) => inv,
            None => {
                warn!("covariance matrix is singular, using pseudo-inverse");
                cov_reg
                    .pseudo_inverse(1e-12)
                    .unwrap_or_else(|_| DMatrix::<f64>::identity(d, d))
            }
        };

        centered
            .row_iter()
            .map(|row| {
                let x = row.transpose();
                let q = (x.transpose() * &precision * &x)[(0, 0)];
                q.max(0.0).sqrt()
            })
            .collect()
    }
}

impl Detector for MahalanobisDetector {
    fn detect(&self, rows: &[Vec<f64>]) -> Vec<Verdict> {
        self.distances(rows)
            .into_iter()
            .map(|dist| Verdict::new(dist > self.critical_distance, dist))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_covariance_reduces_to_euclidean() {
        // Two-point symmetric cloud along each axis: unit variance, zero covariance.
        let rows = vec![
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, -1.0],
        ];
        let distances = MahalanobisDetector::new(3.0, 0.0).distances(&rows);
        // Sample variance per axis is 2/3.
        let expected = (1.5f64).sqrt();
        for d in distances {
            assert!((d - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_correlation_matters() {
        // Strongly correlated cloud; the off-diagonal point is far in Mahalanobis terms.
        let mut rows: Vec<Vec<f64>> = (0..50)
            .map(|i| {
                let t = i as f64 / 10.0;
                vec![t, t + if i % 2 == 0 { 0.05 } else { -0.05 }]
            })
            .collect();
        rows.push(vec![2.5, 2.5]);
        rows.push(vec![2.0, 3.0]);

        let distances = MahalanobisDetector::new(3.0, 1e-8).distances(&rows);
        assert!(distances[51] > 3.0 * distances[50]);

        let verdicts = MahalanobisDetector::new(3.0, 1e-8).detect(&rows);
        assert!(verdicts[51].is_anomaly);
        assert!(!verdicts[50].is_anomaly);
    }

    #[test]
    fn test_constant_batch_is_not_anomalous() {
        let rows = vec![vec![4.0, 4.0]; 10];
        let verdicts = MahalanobisDetector::new(3.0, 1e-8).detect(&rows);
        assert!(verdicts.iter().all(|v| !v.is_anomaly && v.score == 0.0));
    }
}
