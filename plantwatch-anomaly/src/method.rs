// Plantwatch Anomaly - Method selection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The closed set of detection methods.

use crate::config::DetectorParams;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[serde(rename = "zscore")]
    ZScore,
    #[serde(rename = "iqr")]
    Iqr,
    #[serde(rename = "isolation_forest")]
    IsolationForest,
    #[serde(rename = "lof")]
    Lof,
    #[serde(rename = "dbscan")]
    Dbscan,
    #[serde(rename = "multivariate")]
    Multivariate,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 6] = [
        DetectionMethod::ZScore,
        DetectionMethod::Iqr,
        DetectionMethod::IsolationForest,
        DetectionMethod::Lof,
        DetectionMethod::Dbscan,
        DetectionMethod::Multivariate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectionMethod::ZScore => "zscore",
            DetectionMethod::Iqr => "iqr",
            DetectionMethod::IsolationForest => "isolation_forest",
            DetectionMethod::Lof => "lof",
            DetectionMethod::Dbscan => "dbscan",
            DetectionMethod::Multivariate => "multivariate",
        }
    }

    /// Smallest number of complete rows the method can work on.
    pub fn min_rows(&self, params: &DetectorParams, features: usize) -> usize {
        match self {
            DetectionMethod::ZScore | DetectionMethod::Iqr | DetectionMethod::IsolationForest => 2,
            DetectionMethod::Lof => params.n_neighbors + 1,
            DetectionMethod::Dbscan => params.min_samples.max(2),
            DetectionMethod::Multivariate => features + 1,
        }
    }

    /// Whether the method works on z-scaled features.
    pub fn standardizes(&self) -> bool {
        matches!(self, DetectionMethod::Lof | DetectionMethod::Dbscan)
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(DetectionMethod::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectionMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == name)
            .ok_or_else(|| ConfigurationError::UnknownMethod {
                name: s.trim().to_string(),
                valid: Self::valid_names(),
            })
    }
}
