// Plantwatch Testdata - Scenario profiles
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-mode value bands for every sensor.
//!
//! A [`ScenarioProfile`] is immutable for the duration of a generation run.
//! It can be built in code, taken from [`ScenarioProfile::default`] or loaded
//! from JSON:
//!
//! ```json
//! {
//!   "distribution": "clipped_normal",
//!   "normal":  { "temperature": { "min": 20.0, "max": 30.0, "mean": 25.0, "std": 2.0 }, ... },
//!   "alert":   { ... },
//!   "failure": { "temperature": { "min": -10.0, "max": 120.0, "mean": 50.0, "std": 10.0, "null_prob": 0.3 }, ... }
//! }
//! ```

use crate::generator::GeneratorError;
use plantwatch::{Mode, Reading, Sensor};
use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How values are drawn inside a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Normal around `mean` with `std`, clipped to `[min, max]`.
    #[default]
    ClippedNormal,
    /// Uniform over `[min, max]`.
    Uniform,
}

/// Value band of one sensor under one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorBand {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    /// Probability the sensor yields no value. Only meaningful for FAILURE.
    #[serde(default)]
    pub null_prob: f64,
}

impl SensorBand {
    pub fn new(min: f64, max: f64, mean: f64, std: f64) -> Self {
        Self {
            min,
            max,
            mean,
            std,
            null_prob: 0.0,
        }
    }

    pub fn with_null_prob(mut self, p: f64) -> Self {
        self.null_prob = p;
        self
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Draw one value inside the band.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, distribution: Distribution) -> f64 {
        match distribution {
            Distribution::Uniform => rng.gen_range(self.min..=self.max),
            Distribution::ClippedNormal => match Normal::new(self.mean, self.std) {
                Ok(normal) if self.std > 0.0 => normal.sample(rng).clamp(self.min, self.max),
                _ => self.mean.clamp(self.min, self.max),
            },
        }
    }

    fn validate(&self, mode: Mode, sensor: Sensor) -> Result<(), GeneratorError> {
        let finite = [self.min, self.max, self.mean, self.std]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min >= self.max {
            return Err(GeneratorError::Configuration(format!(
                "{} band for {} must satisfy min < max, got [{}, {}]",
                mode, sensor, self.min, self.max
            )));
        }
        if self.std < 0.0 || !self.contains(self.mean) {
            return Err(GeneratorError::Configuration(format!(
                "{} band for {} needs std >= 0 and a mean inside the band",
                mode, sensor
            )));
        }
        if !(0.0..=1.0).contains(&self.null_prob) {
            return Err(GeneratorError::Configuration(format!(
                "{} null probability for {} must be in [0, 1], got {}",
                mode, sensor, self.null_prob
            )));
        }
        if mode != Mode::Failure && self.null_prob > 0.0 {
            return Err(GeneratorError::Configuration(format!(
                "{} readings are always complete; {} cannot have a null probability",
                mode, sensor
            )));
        }
        Ok(())
    }
}

/// Bands of all four sensors under one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    pub temperature: SensorBand,
    pub pressure: SensorBand,
    /// Band of the vibration magnitude.
    pub vibration: SensorBand,
    pub level: SensorBand,
}

impl ModeProfile {
    pub fn band(&self, sensor: Sensor) -> &SensorBand {
        match sensor {
            Sensor::Temperature => &self.temperature,
            Sensor::Pressure => &self.pressure,
            Sensor::Vibration => &self.vibration,
            Sensor::Level => &self.level,
        }
    }

    /// Whether every non-null banded value of the reading lies in its band.
    pub fn contains(&self, reading: &Reading) -> bool {
        Sensor::ALL.iter().all(|sensor| match sensor.value(reading) {
            Some(v) => self.band(*sensor).contains(v),
            None => true,
        })
    }
}

/// Complete per-mode configuration of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProfile {
    #[serde(default)]
    pub distribution: Distribution,
    pub normal: ModeProfile,
    pub alert: ModeProfile,
    pub failure: ModeProfile,
}

impl Default for ScenarioProfile {
    fn default() -> Self {
        let failure_null = 0.3;
        Self {
            distribution: Distribution::ClippedNormal,
            normal: ModeProfile {
                temperature: SensorBand::new(20.0, 30.0, 25.0, 2.0),
                pressure: SensorBand::new(4.0, 6.0, 5.0, 0.5),
                vibration: SensorBand::new(0.3, 0.7, 0.5, 0.1),
                level: SensorBand::new(80.0, 120.0, 100.0, 10.0),
            },
            alert: ModeProfile {
                temperature: SensorBand::new(30.0, 40.0, 35.0, 3.0),
                pressure: SensorBand::new(6.0, 8.0, 7.0, 0.8),
                vibration: SensorBand::new(0.8, 1.5, 1.2, 0.2),
                level: SensorBand::new(130.0, 170.0, 150.0, 15.0),
            },
            failure: ModeProfile {
                temperature: SensorBand::new(-10.0, 120.0, 50.0, 10.0).with_null_prob(failure_null),
                pressure: SensorBand::new(0.0, 15.0, 10.0, 3.0).with_null_prob(failure_null),
                vibration: SensorBand::new(1.5, 5.0, 2.5, 0.5).with_null_prob(failure_null),
                level: SensorBand::new(0.0, 300.0, 200.0, 50.0).with_null_prob(failure_null),
            },
        }
    }
}

impl ScenarioProfile {
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Set the null probability of every FAILURE band.
    pub fn with_failure_null_prob(mut self, p: f64) -> Self {
        for sensor in Sensor::ALL {
            let band = match sensor {
                Sensor::Temperature => &mut self.failure.temperature,
                Sensor::Pressure => &mut self.failure.pressure,
                Sensor::Vibration => &mut self.failure.vibration,
                Sensor::Level => &mut self.failure.level,
            };
            band.null_prob = p;
        }
        self
    }

    pub fn mode(&self, mode: Mode) -> &ModeProfile {
        match mode {
            Mode::Normal => &self.normal,
            Mode::Alert => &self.alert,
            Mode::Failure => &self.failure,
        }
    }

    pub fn band(&self, mode: Mode, sensor: Sensor) -> &SensorBand {
        self.mode(mode).band(sensor)
    }

    /// Check every band.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        for mode in Mode::ALL {
            for sensor in Sensor::ALL {
                self.band(mode, sensor).validate(mode, sensor)?;
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON profile.
    pub fn from_json_str(json: &str) -> Result<Self, GeneratorError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load and validate a JSON profile file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = ScenarioProfile::default();
        profile.validate().unwrap();
        assert_eq!(profile.band(Mode::Normal, Sensor::Temperature).max, 30.0);
        assert_eq!(profile.band(Mode::Alert, Sensor::Temperature).min, 30.0);
        assert_eq!(profile.band(Mode::Failure, Sensor::Level).null_prob, 0.3);
    }

    #[test]
    fn test_sample_stays_in_band() {
        let band = SensorBand::new(4.0, 6.0, 5.0, 5.0);
        let mut rng = StdRng::seed_from_u64(7);
        for distribution in [Distribution::ClippedNormal, Distribution::Uniform] {
            for _ in 0..1000 {
                assert!(band.contains(band.sample(&mut rng, distribution)));
            }
        }
    }

    #[test]
    fn test_zero_std_draws_mean() {
        let band = SensorBand::new(0.0, 10.0, 3.0, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(band.sample(&mut rng, Distribution::ClippedNormal), 3.0);
    }

    #[test]
    fn test_invalid_bands_rejected() {
        let mut profile = ScenarioProfile::default();
        profile.normal.pressure = SensorBand::new(6.0, 4.0, 5.0, 0.5);
        assert!(matches!(
            profile.validate(),
            Err(GeneratorError::Configuration(_))
        ));

        let mut profile = ScenarioProfile::default();
        profile.alert.level = profile.alert.level.with_null_prob(0.1);
        assert!(profile.validate().is_err());

        let profile = ScenarioProfile::default().with_failure_null_prob(1.5);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let profile = ScenarioProfile::default().with_distribution(Distribution::Uniform);
        let json = profile.to_json().unwrap();
        assert!(json.contains("\"uniform\""));
        assert_eq!(ScenarioProfile::from_json_str(&json).unwrap(), profile);
    }
}
