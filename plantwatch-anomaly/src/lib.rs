// Plantwatch Anomaly - Batch anomaly detection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Plantwatch Anomaly
//!
//! Batch anomaly detection over plantwatch readings.
//!
//! Six interchangeable methods, selected from a closed set:
//!
//! | Method | Flags a row when | Score |
//! |--------|------------------|-------|
//! | `zscore` | any feature's \|z\| exceeds `threshold` | max \|z\| |
//! | `iqr` | any feature falls outside the 1.5 IQR fences | max fence distance / IQR |
//! | `isolation_forest` | its isolation score is in the top `contamination` | `2^(-E[h]/c(psi))` |
//! | `lof` | its local outlier factor is in the top `contamination` and above 1 | LOF |
//! | `dbscan` | it belongs to no density cluster | 1 or 0 |
//! | `multivariate` | its Mahalanobis distance exceeds the critical distance | distance |
//!
//! Rows with a null selected feature are always flagged, with score
//! [`NULL_FEATURE_SCORE`].
//!
//! [`BatchStatistics`] reports descriptive statistics of a batch per
//! feature, overall and per mode.
//!
//! ## Example
//!
//! ```rust
//! use plantwatch::{Mode, Reading};
//! use plantwatch_anomaly::{AnomalyEngine, DetectionMethod, DetectorParams};
//!
//! let mut batch: Vec<Reading> = (0..100)
//!     .map(|i| Reading::empty(i, Mode::Normal).with_temperature(25.0 + (i % 5) as f64 * 0.1))
//!     .collect();
//! batch[50].temperature = Some(90.0);
//!
//! let engine = AnomalyEngine::new(DetectorParams::default()).unwrap();
//! let results = engine.detect(&batch, DetectionMethod::ZScore).unwrap();
//!
//! assert!(results[50].is_anomaly);
//! assert_eq!(results.iter().filter(|r| r.is_anomaly).count(), 1);
//! ```

pub mod analysis;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod features;
pub mod method;
pub mod result;
pub mod stats;

pub use analysis::{BatchStatistics, FeatureStatistics, ModeStatistics, SENSOR_FEATURES};
pub use config::DetectorParams;
pub use detectors::{Detector, Verdict};
pub use engine::{summarize, AnomalyEngine, MethodReport};
pub use error::{ConfigurationError, Result};
pub use features::{FeatureMatrix, FeatureSelection};
pub use method::DetectionMethod;
pub use result::{AnomalyResult, DetectionSummary, NULL_FEATURE_SCORE};
