// Plantwatch Testdata - Anomaly injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly injection for testing detectors.
//!
//! Injected readings carry no marker: the only trace of an injection is a
//! value outside the band of the reading's own mode.

use crate::generator::GeneratorError;
use crate::profile::ModeProfile;
use plantwatch::{Reading, Sensor};
use rand::prelude::*;
use rand_distr::UnitSphere;
use serde::{Deserialize, Serialize};

/// Anomaly injection configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Per-sample injection probability.
    pub rate: f64,
    /// Upper bound on the number of sensors overwritten in one sample.
    pub max_sensors: usize,
    /// Smallest excursion beyond the band, in band widths.
    pub min_scale: f64,
    /// Largest excursion beyond the band, in band widths.
    pub max_scale: f64,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            rate: 0.05,
            max_sensors: 2,
            min_scale: 1.0,
            max_scale: 3.0,
        }
    }
}

impl InjectionConfig {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            ..Default::default()
        }
    }

    pub fn with_max_sensors(mut self, n: usize) -> Self {
        self.max_sensors = n;
        self
    }

    pub fn with_scale_range(mut self, min: f64, max: f64) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    pub fn validate(&self) -> Result<(), GeneratorError> {
        if !(0.0..=1.0).contains(&self.rate) {
            return Err(GeneratorError::Configuration(format!(
                "injection rate must be in [0, 1], got {}",
                self.rate
            )));
        }
        if self.max_sensors == 0 || self.max_sensors > Sensor::ALL.len() {
            return Err(GeneratorError::Configuration(format!(
                "injection must touch between 1 and {} sensors, got {}",
                Sensor::ALL.len(),
                self.max_sensors
            )));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.max_scale.is_finite()) {
            return Err(GeneratorError::Configuration(format!(
                "injection scale range [{}, {}] is invalid",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }

    /// Maybe overwrite sensors of `reading` with out-of-band values.
    ///
    /// Returns the sensors that were overwritten, empty when the sample was
    /// left alone.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        reading: &mut Reading,
        bands: &ModeProfile,
        rng: &mut R,
    ) -> Vec<Sensor> {
        if !rng.gen_bool(self.rate) {
            return Vec::new();
        }

        let count = rng.gen_range(1..=self.max_sensors);
        let chosen: Vec<Sensor> = Sensor::ALL.choose_multiple(rng, count).copied().collect();

        for sensor in &chosen {
            let band = bands.band(*sensor);
            let excursion = band.width() * rng.gen_range(self.min_scale..=self.max_scale);
            // Vibration is a magnitude and only spikes upward.
            let upward = *sensor == Sensor::Vibration || rng.gen_bool(0.5);
            let value = if upward {
                band.max + excursion
            } else {
                band.min - excursion
            };
            overwrite(reading, *sensor, value, rng);
        }

        chosen
    }
}

fn overwrite<R: Rng + ?Sized>(reading: &mut Reading, sensor: Sensor, value: f64, rng: &mut R) {
    match sensor {
        Sensor::Temperature => reading.temperature = Some(value),
        Sensor::Pressure => reading.pressure = Some(value),
        Sensor::Level => reading.level = Some(value),
        Sensor::Vibration => {
            let (x, y, z) = match reading.vibration_norm() {
                Some(norm) if norm > 0.0 => {
                    let k = value / norm;
                    (
                        reading.vibration_x.unwrap_or_default() * k,
                        reading.vibration_y.unwrap_or_default() * k,
                        reading.vibration_z.unwrap_or_default() * k,
                    )
                }
                _ => spherical_components(value, rng),
            };
            reading.vibration_x = Some(x);
            reading.vibration_y = Some(y);
            reading.vibration_z = Some(z);
            reading.vibration_mag = Some(value);
        }
    }
}

/// Split a magnitude into axis components along a random direction,
/// uniform over the sphere.
pub fn spherical_components<R: Rng + ?Sized>(magnitude: f64, rng: &mut R) -> (f64, f64, f64) {
    let [x, y, z]: [f64; 3] = UnitSphere.sample(rng);
    (magnitude * x, magnitude * y, magnitude * z)
}
