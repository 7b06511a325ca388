// Plantwatch Anomaly - Detection engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! AnomalyEngine - runs detection methods over reading batches.

use crate::config::DetectorParams;
use crate::detectors::{
    DbscanDetector, Detector, IqrDetector, IsolationForestDetector, LofDetector,
    MahalanobisDetector, Verdict, ZScoreDetector,
};
use crate::error::{ConfigurationError, Result};
use crate::features::{FeatureMatrix, FeatureSelection};
use crate::method::DetectionMethod;
use crate::result::{AnomalyResult, DetectionSummary};
use crate::stats;
use log::debug;
use plantwatch::{Feature, Reading};
use std::thread;
use std::time::Instant;

/// Results of one method over one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodReport {
    pub method: DetectionMethod,
    pub results: Vec<AnomalyResult>,
}

impl MethodReport {
    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary::from_results(self.method, &self.results)
    }
}

/// Stateless detection front end.
///
/// Holds validated parameters and the feature selection; every call is
/// independent of the previous ones.
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    params: DetectorParams,
    selection: FeatureSelection,
}

impl AnomalyEngine {
    /// Create an engine. Fails on out-of-range parameters.
    pub fn new(params: DetectorParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            selection: FeatureSelection::Auto,
        })
    }

    /// Restrict detection to `features`.
    pub fn with_features(mut self, features: &[Feature]) -> Result<Self> {
        self.selection = FeatureSelection::explicit(features)?;
        Ok(self)
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn selection(&self) -> &FeatureSelection {
        &self.selection
    }

    /// Run one method. Returns one result per batch row, in batch order.
    pub fn detect(&self, batch: &[Reading], method: DetectionMethod) -> Result<Vec<AnomalyResult>> {
        let matrix = FeatureMatrix::build(batch, &self.selection)?;
        self.check_size(method, &matrix)?;
        let scaled = method.standardizes().then(|| stats::standardize(matrix.rows()));
        Ok(self.run(method, &matrix, scaled.as_deref()))
    }

    /// Run a method selected by name.
    pub fn detect_by_name(&self, batch: &[Reading], name: &str) -> Result<Vec<AnomalyResult>> {
        self.detect(batch, name.parse()?)
    }

    /// Run several methods concurrently over the same batch.
    ///
    /// Every method is checked before any of them runs, so a failure leaves
    /// no partial output.
    pub fn detect_many(&self, batch: &[Reading], methods: &[DetectionMethod]) -> Result<Vec<MethodReport>> {
        let matrix = FeatureMatrix::build(batch, &self.selection)?;
        for method in methods {
            self.check_size(*method, &matrix)?;
        }
        let scaled = methods
            .iter()
            .any(DetectionMethod::standardizes)
            .then(|| stats::standardize(matrix.rows()));

        let reports: Vec<MethodReport> = thread::scope(|scope| {
            let handles: Vec<_> = methods
                .iter()
                .map(|&method| {
                    let matrix = &matrix;
                    let scaled = scaled.as_deref();
                    scope.spawn(move || MethodReport {
                        method,
                        results: self.run(method, matrix, scaled),
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        Ok(reports)
    }

    fn check_size(&self, method: DetectionMethod, matrix: &FeatureMatrix) -> Result<()> {
        let minimum = method.min_rows(&self.params, matrix.dimensions());
        if matrix.complete() < minimum {
            return Err(ConfigurationError::BatchTooSmall {
                method,
                minimum,
                actual: matrix.complete(),
            });
        }
        Ok(())
    }

    fn run(&self, method: DetectionMethod, matrix: &FeatureMatrix, scaled: Option<&[Vec<f64>]>) -> Vec<AnomalyResult> {
        let started = Instant::now();
        let rows = match (method.standardizes(), scaled) {
            (true, Some(scaled)) => scaled,
            _ => matrix.rows(),
        };
        let verdicts = self.verdicts(method, matrix.dimensions(), rows);

        let mut results: Vec<AnomalyResult> = (0..matrix.total())
            .map(|i| AnomalyResult::null_row(i, method))
            .collect();
        for (&index, verdict) in matrix.row_index().iter().zip(verdicts) {
            results[index] = AnomalyResult::new(index, method, verdict.is_anomaly, verdict.score);
        }

        debug!(
            "{} scored {} rows ({} null) in {:?}",
            method,
            matrix.total(),
            matrix.null_rows(),
            started.elapsed()
        );
        results
    }

    fn verdicts(&self, method: DetectionMethod, dimensions: usize, rows: &[Vec<f64>]) -> Vec<Verdict> {
        let p = &self.params;
        match method {
            DetectionMethod::ZScore => ZScoreDetector::new(p.threshold).detect(rows),
            DetectionMethod::Iqr => IqrDetector::default().detect(rows),
            DetectionMethod::IsolationForest => {
                IsolationForestDetector::new(p.n_estimators, p.max_samples, p.contamination, p.seed)
                    .detect(rows)
            }
            DetectionMethod::Lof => LofDetector::new(p.n_neighbors, p.contamination).detect(rows),
            DetectionMethod::Dbscan => DbscanDetector::new(p.eps, p.min_samples).detect(rows),
            DetectionMethod::Multivariate => {
                MahalanobisDetector::new(p.critical_distance_for(dimensions), p.covariance_epsilon)
                    .detect(rows)
            }
        }
    }
}

impl Default for AnomalyEngine {
    fn default() -> Self {
        Self {
            params: DetectorParams::default(),
            selection: FeatureSelection::Auto,
        }
    }
}

/// Summaries of several reports.
pub fn summarize(reports: &[MethodReport]) -> Vec<DetectionSummary> {
    reports.iter().map(MethodReport::summary).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantwatch::Mode;

    fn batch(n: usize) -> Vec<Reading> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                Reading::empty(i as u64, Mode::Normal)
                    .with_temperature(25.0 + (t * 0.7).sin())
                    .with_pressure(5.0 + (t * 1.3).cos() * 0.2)
            })
            .collect()
    }

    #[test]
    fn test_one_result_per_row() {
        let engine = AnomalyEngine::default();
        for method in DetectionMethod::ALL {
            let results = engine.detect(&batch(40), method).unwrap();
            assert_eq!(results.len(), 40);
            for (i, r) in results.iter().enumerate() {
                assert_eq!(r.row_index, i);
                assert_eq!(r.method, method);
            }
        }
    }

    #[test]
    fn test_null_rows_are_flagged() {
        let mut readings = batch(30);
        readings[4].pressure = None;
        let results = AnomalyEngine::default()
            .detect(&readings, DetectionMethod::ZScore)
            .unwrap();
        assert!(results[4].is_anomaly);
        assert!(results[4].is_null_row());
        assert!(!results[5].is_null_row());
    }

    #[test]
    fn test_batch_too_small() {
        let err = AnomalyEngine::default()
            .detect(&batch(10), DetectionMethod::Lof)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::BatchTooSmall {
                method: DetectionMethod::Lof,
                minimum: 21,
                actual: 10
            }
        );

        let err = AnomalyEngine::default()
            .detect(&batch(1), DetectionMethod::ZScore)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BatchTooSmall { minimum: 2, .. }));
    }

    #[test]
    fn test_null_rows_do_not_count_toward_minimum() {
        let mut readings = batch(3);
        readings[0].temperature = None;
        readings[1].temperature = None;
        let err = AnomalyEngine::default()
            .detect(&readings, DetectionMethod::Iqr)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BatchTooSmall { actual: 1, .. }));
    }

    #[test]
    fn test_detect_many_matches_sequential() {
        let engine = AnomalyEngine::default();
        let readings = batch(60);
        let reports = engine.detect_many(&readings, &DetectionMethod::ALL).unwrap();
        assert_eq!(reports.len(), 6);
        for report in &reports {
            assert_eq!(report.results, engine.detect(&readings, report.method).unwrap());
        }
    }

    #[test]
    fn test_detect_many_fails_before_running() {
        let err = AnomalyEngine::default()
            .detect_many(&batch(10), &[DetectionMethod::ZScore, DetectionMethod::Lof])
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::BatchTooSmall { .. }));
    }

    #[test]
    fn test_unknown_method_name() {
        let err = AnomalyEngine::default()
            .detect_by_name(&batch(10), "svm")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMethod { .. }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(AnomalyEngine::new(DetectorParams::new().with_eps(0.0)).is_err());
    }
}
