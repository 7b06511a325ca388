// Plantwatch Monitor - Threshold bands
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Static per-sensor threshold bands.
//!
//! ```text
//!   CRITICAL  |  WARNING  |       ok        |  WARNING  |  CRITICAL
//! ----------- min ---- warning_min ---- warning_max ---- max -----------
//! ```
//!
//! Limits themselves are inside the band; only values strictly beyond a
//! limit violate it.

use crate::alert::Severity;
use crate::error::{MonitorError, Result};
use plantwatch::Sensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Four-limit band for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub min: f64,
    pub warning_min: f64,
    pub warning_max: f64,
    pub max: f64,
}

/// Which side of the band a value fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Below,
    Above,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Below => "below",
            Direction::Above => "above",
        })
    }
}

/// A value outside a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub severity: Severity,
    pub direction: Direction,
    /// The limit that was crossed.
    pub limit: f64,
}

impl ThresholdBand {
    pub fn new(min: f64, warning_min: f64, warning_max: f64, max: f64) -> Self {
        Self {
            min,
            warning_min,
            warning_max,
            max,
        }
    }

    /// Limits must be finite and ordered `min <= warning_min <= warning_max <= max`.
    pub fn validate(&self, sensor: Sensor) -> Result<()> {
        let limits = [self.min, self.warning_min, self.warning_max, self.max];
        if limits.iter().any(|v| !v.is_finite()) {
            return Err(MonitorError::InvalidBand {
                sensor,
                reason: "limits must be finite".to_string(),
            });
        }
        if !limits.windows(2).all(|w| w[0] <= w[1]) {
            return Err(MonitorError::InvalidBand {
                sensor,
                reason: format!(
                    "expected min <= warning_min <= warning_max <= max, got {}/{}/{}/{}",
                    self.min, self.warning_min, self.warning_max, self.max
                ),
            });
        }
        Ok(())
    }

    /// Classify a value. Hard limits are checked first, so a value beyond
    /// `max` is CRITICAL only.
    pub fn check(&self, value: f64) -> Option<Violation> {
        let (severity, direction, limit) = if value > self.max {
            (Severity::Critical, Direction::Above, self.max)
        } else if value < self.min {
            (Severity::Critical, Direction::Below, self.min)
        } else if value > self.warning_max {
            (Severity::Warning, Direction::Above, self.warning_max)
        } else if value < self.warning_min {
            (Severity::Warning, Direction::Below, self.warning_min)
        } else {
            return None;
        };
        Some(Violation {
            severity,
            direction,
            limit,
        })
    }
}

/// Bands keyed by sensor. Sensors without a band are not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<Sensor, ThresholdBand>);

impl Thresholds {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_band(mut self, sensor: Sensor, band: ThresholdBand) -> Self {
        self.0.insert(sensor, band);
        self
    }

    pub fn band(&self, sensor: Sensor) -> Option<&ThresholdBand> {
        self.0.get(&sensor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sensor, &ThresholdBand)> {
        self.0.iter().map(|(s, b)| (*s, b))
    }

    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(|(sensor, band)| band.validate(sensor))
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::empty()
            .with_band(Sensor::Temperature, ThresholdBand::new(10.0, 20.0, 30.0, 40.0))
            .with_band(Sensor::Pressure, ThresholdBand::new(3.0, 4.0, 6.0, 8.0))
            .with_band(Sensor::Vibration, ThresholdBand::new(0.0, 0.0, 0.7, 1.5))
            .with_band(Sensor::Level, ThresholdBand::new(60.0, 80.0, 120.0, 170.0))
    }
}
