// Plantwatch Testdata - Synthetic sensor readings
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Plantwatch Testdata
//!
//! Scenario-driven generator of synthetic plant readings.
//!
//! - **Profiles**: per-mode value bands for temperature, pressure, vibration
//!   and level, with per-sensor null probabilities for FAILURE
//! - **Generator**: fixed-interval, seeded, one-pass reading sequences
//! - **Anomaly injection**: unlabeled out-of-band excursions for detector tests
//! - **Datasets**: CSV and JSON files in the plantwatch schema
//!
//! ## Quick Start
//!
//! ```rust
//! use plantwatch::Mode;
//! use plantwatch_testdata::{GeneratorConfig, ModeSelector, ScenarioGenerator, ScenarioProfile};
//!
//! let config = GeneratorConfig::new()
//!     .with_count(100)
//!     .with_interval_secs(2)
//!     .with_seed(42)
//!     .with_anomaly_rate(0.05);
//!
//! let generator = ScenarioGenerator::new(ModeSelector::All, config, ScenarioProfile::default()).unwrap();
//! let readings: Vec<_> = generator.collect();
//!
//! assert_eq!(readings.len(), 300);
//! assert_eq!(readings[150].mode, Mode::Alert);
//! ```

pub mod anomalies;
pub mod dataset;
pub mod generator;
pub mod profile;
pub mod scenario;

// Re-exports for convenience
pub use anomalies::InjectionConfig;
pub use dataset::{Dataset, DatasetError, DatasetMetadata, DatasetSummary};
pub use generator::{generate_dataset, GeneratorConfig, GeneratorError, ScenarioGenerator};
pub use profile::{Distribution, ModeProfile, ScenarioProfile, SensorBand};
pub use scenario::ModeSelector;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
