// Plantwatch Anomaly - Detection results
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Detection results and summaries.

use crate::method::DetectionMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score given to rows with a null selected feature.
pub const NULL_FEATURE_SCORE: f64 = f64::INFINITY;

/// Verdict of one method on one batch row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Position of the row in the input batch.
    pub row_index: usize,
    pub method: DetectionMethod,
    pub is_anomaly: bool,
    /// Method-specific scale; not comparable across methods.
    pub score: f64,
    /// The row had a null selected feature and was not scored.
    #[serde(skip)]
    pub null_features: bool,
}

impl AnomalyResult {
    pub fn new(row_index: usize, method: DetectionMethod, is_anomaly: bool, score: f64) -> Self {
        Self {
            row_index,
            method,
            is_anomaly,
            score,
            null_features: false,
        }
    }

    /// Result for a row that could not be scored because of nulls.
    pub fn null_row(row_index: usize, method: DetectionMethod) -> Self {
        Self {
            null_features: true,
            ..Self::new(row_index, method, true, NULL_FEATURE_SCORE)
        }
    }

    pub fn method_name(&self) -> &'static str {
        self.method.name()
    }

    pub fn is_null_row(&self) -> bool {
        self.null_features
    }
}

/// Aggregate of one method's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub method: DetectionMethod,
    pub rows: usize,
    pub anomalies: usize,
    /// Rows flagged because of null features.
    pub null_rows: usize,
    pub rate: f64,
}

impl DetectionSummary {
    pub fn from_results(method: DetectionMethod, results: &[AnomalyResult]) -> Self {
        let rows = results.len();
        let anomalies = results.iter().filter(|r| r.is_anomaly).count();
        let null_rows = results.iter().filter(|r| r.is_null_row()).count();
        let rate = if rows == 0 {
            0.0
        } else {
            anomalies as f64 / rows as f64
        };
        Self {
            method,
            rows,
            anomalies,
            null_rows,
            rate,
        }
    }
}

impl fmt::Display for DetectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} anomalies in {} rows ({:.2}%), {} from null features",
            self.method,
            self.anomalies,
            self.rows,
            self.rate * 100.0,
            self.null_rows
        )
    }
}
