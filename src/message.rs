//! Streaming message schema.
//!
//! One JSON object per reading, as published by the field device:
//!
//! ```json
//! {"timestamp": 1706745600, "temperature": 24.7, "pressure": 5.1,
//!  "vibration": 0.41, "level": 101.2, "accel_x": 0.21, "accel_y": -0.33,
//!  "accel_z": 0.12, "sensor_failure": false, "network_failure": false}
//! ```
//!
//! JSON `null` and missing numeric keys both become null fields, matching
//! the CSV `NULL` token.

use crate::error::ValidationError;
use crate::reading::{Mode, Reading};
use serde::{Deserialize, Serialize};

/// Wire form of a reading on the live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub timestamp: u64,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    /// Vibration magnitude.
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default)]
    pub accel_x: Option<f64>,
    #[serde(default)]
    pub accel_y: Option<f64>,
    #[serde(default)]
    pub accel_z: Option<f64>,
    #[serde(default)]
    pub sensor_failure: bool,
    #[serde(default)]
    pub network_failure: bool,
    /// Optional integer mode code; publishers replaying generated data set it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u8>,
}

/// A reading received from the live stream together with its transport flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    pub reading: Reading,
    pub sensor_failure: bool,
    pub network_failure: bool,
}

impl StreamMessage {
    /// Parse a JSON line.
    pub fn parse(line: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(line.trim()).map_err(|e| ValidationError::MalformedMessage(e.to_string()))
    }

    /// Build a message from a reading.
    pub fn from_reading(reading: &Reading, network_failure: bool) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            pressure: reading.pressure,
            vibration: reading.vibration_mag,
            level: reading.level,
            accel_x: reading.vibration_x,
            accel_y: reading.vibration_y,
            accel_z: reading.vibration_z,
            sensor_failure: reading.mode == Mode::Failure,
            network_failure,
            mode: Some(reading.mode.code()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Convert to a reading.
    ///
    /// Without an explicit mode the reading is FAILURE when the device
    /// reports a sensor failure and NORMAL otherwise.
    pub fn into_live_reading(self) -> Result<LiveReading, ValidationError> {
        let mode = match self.mode {
            Some(code) => {
                Mode::from_code(code).ok_or_else(|| ValidationError::UnknownMode(code.to_string()))?
            }
            None if self.sensor_failure => Mode::Failure,
            None => Mode::Normal,
        };

        for (name, value) in [
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("vibration", self.vibration),
            ("level", self.level),
            ("accel_x", self.accel_x),
            ("accel_y", self.accel_y),
            ("accel_z", self.accel_z),
        ] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ValidationError::InvalidNumber {
                        column: name,
                        value: v.to_string(),
                    });
                }
            }
        }

        let reading = Reading {
            timestamp: self.timestamp,
            mode,
            temperature: self.temperature,
            pressure: self.pressure,
            vibration_x: self.accel_x,
            vibration_y: self.accel_y,
            vibration_z: self.accel_z,
            vibration_mag: self.vibration,
            level: self.level,
        };

        Ok(LiveReading {
            reading,
            sensor_failure: self.sensor_failure,
            network_failure: self.network_failure,
        })
    }
}

/// Parse a JSON line straight into a [`LiveReading`].
pub fn parse_live_reading(line: &str) -> Result<LiveReading, ValidationError> {
    StreamMessage::parse(line)?.into_live_reading()
}
