// Plantwatch Anomaly - Detector parameters
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Detector parameters shared by all methods.

use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};

/// Upper standard normal quantile at 0.999.
const Z_0999: f64 = 3.090_232_306_167_813;

/// Numeric parameters for every detection method.
///
/// Each method reads only the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Z-score cutoff.
    pub threshold: f64,
    /// Expected anomalous fraction for isolation forest and LOF.
    pub contamination: f64,
    /// LOF neighborhood size.
    pub n_neighbors: usize,
    /// DBSCAN neighborhood radius, in standardized units.
    pub eps: f64,
    /// DBSCAN minimum neighborhood size, the point itself included.
    pub min_samples: usize,
    /// Isolation trees in the ensemble.
    pub n_estimators: usize,
    /// Rows drawn per isolation tree.
    pub max_samples: usize,
    /// Seed for the isolation forest.
    pub seed: u64,
    /// Mahalanobis cutoff. Derived from the feature count when `None`.
    pub critical_distance: Option<f64>,
    /// Ridge added to the covariance diagonal.
    pub covariance_epsilon: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            contamination: 0.05,
            n_neighbors: 20,
            eps: 0.5,
            min_samples: 5,
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
            critical_distance: None,
            covariance_epsilon: 1e-8,
        }
    }
}

impl DetectorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_n_neighbors(mut self, n: usize) -> Self {
        self.n_neighbors = n;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_min_samples(mut self, n: usize) -> Self {
        self.min_samples = n;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_critical_distance(mut self, distance: f64) -> Self {
        self.critical_distance = Some(distance);
        self
    }

    /// Mahalanobis cutoff for `dimensions` features.
    ///
    /// Defaults to the square root of the chi-square 0.999 quantile
    /// (Wilson-Hilferty approximation).
    pub fn critical_distance_for(&self, dimensions: usize) -> f64 {
        self.critical_distance
            .unwrap_or_else(|| chi_square_quantile_0999(dimensions).sqrt())
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: &str) -> Result<()> {
            Err(ConfigurationError::InvalidParameter {
                name,
                reason: reason.to_string(),
            })
        }

        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return invalid("threshold", "must be a positive number");
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return invalid("contamination", "must be in (0, 0.5]");
        }
        if self.n_neighbors == 0 {
            return invalid("n_neighbors", "must be at least 1");
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return invalid("eps", "must be a positive number");
        }
        if self.min_samples == 0 {
            return invalid("min_samples", "must be at least 1");
        }
        if self.n_estimators == 0 {
            return invalid("n_estimators", "must be at least 1");
        }
        if self.max_samples < 2 {
            return invalid("max_samples", "must be at least 2");
        }
        if let Some(d) = self.critical_distance {
            if !(d.is_finite() && d > 0.0) {
                return invalid("critical_distance", "must be a positive number");
            }
        }
        if !(self.covariance_epsilon.is_finite() && self.covariance_epsilon >= 0.0) {
            return invalid("covariance_epsilon", "must be non-negative");
        }
        Ok(())
    }
}

fn chi_square_quantile_0999(dof: usize) -> f64 {
    let k = dof.max(1) as f64;
    let h = 2.0 / (9.0 * k);
    k * (1.0 - h + Z_0999 * h.sqrt()).powi(3)
}
