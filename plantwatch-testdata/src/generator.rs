// Plantwatch Testdata - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Core reading generation logic.
//!
//! [`ScenarioGenerator`] is a one-pass iterator: it validates everything up
//! front, then yields readings at a fixed interval until the requested
//! count has been produced for every selected mode.

use crate::anomalies::{spherical_components, InjectionConfig};
use crate::dataset::{Dataset, DatasetMetadata};
use crate::profile::{ModeProfile, ScenarioProfile};
use crate::scenario::ModeSelector;
use log::debug;
use plantwatch::{Mode, Reading, Sensor};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Generator error types.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Invalid run parameters. Raised before any reading is produced.
    #[error("invalid generator configuration: {0}")]
    Configuration(String),

    #[error("invalid profile JSON: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Timestamp of the first reading, in seconds.
    pub start_time: u64,
    /// Seconds between consecutive readings.
    pub interval_secs: u64,
    /// Readings per selected mode.
    pub count: usize,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Anomaly injection, disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection: Option<InjectionConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_time: 1_706_745_600, // 2024-02-01 00:00:00 UTC
            interval_secs: 1,
            count: 1000,
            seed: None,
            injection: None,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set start timestamp.
    pub fn with_start_time(mut self, timestamp: u64) -> Self {
        self.start_time = timestamp;
        self
    }

    /// Start at the current wall-clock second.
    pub fn with_start_now(mut self) -> Self {
        self.start_time = chrono::Utc::now().timestamp().max(0) as u64;
        self
    }

    /// Set sample interval in seconds.
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Set number of samples per mode.
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = n;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable anomaly injection.
    pub fn with_injection(mut self, injection: InjectionConfig) -> Self {
        self.injection = Some(injection);
        self
    }

    /// Enable anomaly injection at `rate` with default excursions.
    pub fn with_anomaly_rate(self, rate: f64) -> Self {
        self.with_injection(InjectionConfig::new(rate))
    }

    fn validate(&self, blocks: usize) -> Result<(), GeneratorError> {
        if self.count == 0 {
            return Err(GeneratorError::Configuration(
                "sample count must be positive".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(GeneratorError::Configuration(
                "interval must be at least one second".to_string(),
            ));
        }
        if let Some(injection) = &self.injection {
            injection.validate()?;
        }
        let last_offset = (self.count as u64)
            .checked_mul(blocks as u64)
            .and_then(|n| n.checked_mul(self.interval_secs))
            .and_then(|span| self.start_time.checked_add(span));
        if last_offset.is_none() {
            return Err(GeneratorError::Configuration(
                "timestamps would overflow".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lazy, finite sequence of synthetic readings.
pub struct ScenarioGenerator {
    config: GeneratorConfig,
    profile: ScenarioProfile,
    blocks: Vec<Mode>,
    block: usize,
    in_block: usize,
    emitted: u64,
    rng: StdRng,
}

impl ScenarioGenerator {
    /// Validate the run and prepare the generator. No reading is produced
    /// when this fails.
    pub fn new(
        selector: ModeSelector,
        config: GeneratorConfig,
        profile: ScenarioProfile,
    ) -> Result<Self, GeneratorError> {
        let blocks = selector.modes();
        config.validate(blocks.len())?;
        profile.validate()?;

        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        debug!(
            "generating {} readings per mode for {} starting at {}",
            config.count, selector, config.start_time
        );

        Ok(Self {
            config,
            profile,
            blocks,
            block: 0,
            in_block: 0,
            emitted: 0,
            rng,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn profile(&self) -> &ScenarioProfile {
        &self.profile
    }

    /// Total readings this generator will yield.
    pub fn total(&self) -> usize {
        self.config.count * self.blocks.len()
    }

    fn sample(&mut self, timestamp: u64, mode: Mode) -> Reading {
        let bands = *self.profile.mode(mode);
        let distribution = self.profile.distribution;
        let mut reading = Reading::empty(timestamp, mode);

        for sensor in Sensor::ALL {
            let band = bands.band(sensor);
            if band.null_prob > 0.0 && self.rng.gen_bool(band.null_prob) {
                continue;
            }
            let value = band.sample(&mut self.rng, distribution);
            match sensor {
                Sensor::Temperature => reading.temperature = Some(value),
                Sensor::Pressure => reading.pressure = Some(value),
                Sensor::Level => reading.level = Some(value),
                Sensor::Vibration => {
                    let (x, y, z) = spherical_components(value, &mut self.rng);
                    reading = reading.with_vibration(x, y, z);
                    // Rounding in the norm must not push a clipped draw out of band.
                    reading.vibration_mag = reading.vibration_mag.map(|m| m.clamp(band.min, band.max));
                }
            }
        }

        if let Some(injection) = self.config.injection {
            inject(&injection, &mut reading, &bands, &mut self.rng);
        }

        reading
    }
}

fn inject(injection: &InjectionConfig, reading: &mut Reading, bands: &ModeProfile, rng: &mut StdRng) {
    let touched = injection.apply(reading, bands, rng);
    if !touched.is_empty() {
        debug!("injected anomaly at {} into {:?}", reading.timestamp, touched);
    }
}

impl Iterator for ScenarioGenerator {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        let mode = *self.blocks.get(self.block)?;
        let timestamp = self.config.start_time + self.emitted * self.config.interval_secs;
        let reading = self.sample(timestamp, mode);

        self.emitted += 1;
        self.in_block += 1;
        if self.in_block == self.config.count {
            self.block += 1;
            self.in_block = 0;
        }
        Some(reading)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.emitted as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ScenarioGenerator {}

/// Generate a complete dataset in one call.
pub fn generate_dataset(
    selector: ModeSelector,
    config: &GeneratorConfig,
    profile: &ScenarioProfile,
) -> Result<Dataset, GeneratorError> {
    let generator = ScenarioGenerator::new(selector, config.clone(), profile.clone())?;
    let metadata = DatasetMetadata {
        generated_at: Some(chrono::Utc::now()),
        selector: Some(selector.to_string()),
        seed: config.seed,
        interval_secs: Some(config.interval_secs),
        injection_rate: config.injection.map(|i| i.rate),
    };
    Ok(Dataset::from_readings(generator.collect()).with_metadata(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(count: usize) -> GeneratorConfig {
        GeneratorConfig::new().with_count(count).with_seed(42)
    }

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.interval_secs, 1);
        assert!(config.injection.is_none());
    }

    #[test]
    fn test_fail_fast_on_bad_config() {
        let profile = ScenarioProfile::default();
        for config in [
            seeded(0),
            seeded(10).with_interval_secs(0),
            seeded(10).with_anomaly_rate(-0.1),
            seeded(10).with_start_time(u64::MAX),
        ] {
            let result = ScenarioGenerator::new(ModeSelector::All, config, profile.clone());
            assert!(matches!(result, Err(GeneratorError::Configuration(_))));
        }
    }

    #[test]
    fn test_timestamps_step_by_interval() {
        let config = seeded(5).with_start_time(1000).with_interval_secs(2);
        let generator =
            ScenarioGenerator::new(ModeSelector::All, config, ScenarioProfile::default()).unwrap();
        assert_eq!(generator.len(), 15);

        let readings: Vec<Reading> = generator.collect();
        assert_eq!(readings.len(), 15);
        for (i, reading) in readings.iter().enumerate() {
            assert_eq!(reading.timestamp, 1000 + 2 * i as u64);
        }
        assert_eq!(readings[4].mode, Mode::Normal);
        assert_eq!(readings[5].mode, Mode::Alert);
        assert_eq!(readings[14].mode, Mode::Failure);
    }

    #[test]
    fn test_same_seed_same_readings() {
        let profile = ScenarioProfile::default();
        let a: Vec<Reading> =
            ScenarioGenerator::new(ModeSelector::All, seeded(50), profile.clone())
                .unwrap()
                .collect();
        let b: Vec<Reading> = ScenarioGenerator::new(ModeSelector::All, seeded(50), profile)
            .unwrap()
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_vibration_magnitude_is_norm() {
        let generator = ScenarioGenerator::new(
            Mode::Alert.into(),
            seeded(200),
            ScenarioProfile::default(),
        )
        .unwrap();
        for reading in generator {
            let mag = reading.vibration_mag.unwrap();
            approx::assert_relative_eq!(mag, reading.vibration_norm().unwrap(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_failure_nulls_whole_vibration_sensor() {
        let generator = ScenarioGenerator::new(
            Mode::Failure.into(),
            seeded(300),
            ScenarioProfile::default(),
        )
        .unwrap();
        for reading in generator {
            let axes = [reading.vibration_x, reading.vibration_y, reading.vibration_z];
            if reading.vibration_mag.is_none() {
                assert!(axes.iter().all(Option::is_none));
            } else {
                assert!(axes.iter().all(Option::is_some));
            }
        }
    }

    #[test]
    fn test_generate_dataset_metadata() {
        let config = seeded(10).with_anomaly_rate(0.2);
        let dataset =
            generate_dataset(ModeSelector::All, &config, &ScenarioProfile::default()).unwrap();
        assert_eq!(dataset.len(), 30);
        assert_eq!(dataset.metadata.seed, Some(42));
        assert_eq!(dataset.metadata.injection_rate, Some(0.2));
        assert_eq!(dataset.metadata.selector.as_deref(), Some("ALL"));
    }
}
