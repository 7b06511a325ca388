//! Reading data model shared by every stage of the pipeline.
//!
//! A [`Reading`] is one timestamped observation of the four plant sensors.
//! Numeric fields are `Option<f64>` because a failing sensor or a dropped
//! network packet yields no value; `timestamp` and `mode` are always present.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating regime a reading was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Nominal process values.
    Normal,
    /// Process drifting outside nominal values.
    Alert,
    /// Sensor or network malfunction.
    Failure,
}

impl Mode {
    /// All modes in generation order.
    pub const ALL: [Mode; 3] = [Mode::Normal, Mode::Alert, Mode::Failure];

    /// Integer code used in the CSV `mode` column.
    pub fn code(&self) -> u8 {
        match self {
            Mode::Normal => 0,
            Mode::Alert => 1,
            Mode::Failure => 2,
        }
    }

    /// Mode for a CSV integer code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Mode::Normal),
            1 => Some(Mode::Alert),
            2 => Some(Mode::Failure),
            _ => None,
        }
    }

    /// Human-readable label, mirrored in the `status` column.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Alert => "ALERT",
            Mode::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a mode token is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode token '{}'", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Accepts the integer codes `0`, `1`, `2` and the labels
    /// `normal`, `alert`, `failure` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if let Ok(code) = token.parse::<u8>() {
            return Mode::from_code(code).ok_or_else(|| UnknownMode(token.to_string()));
        }
        match token.to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "alert" => Ok(Mode::Alert),
            "failure" => Ok(Mode::Failure),
            _ => Err(UnknownMode(token.to_string())),
        }
    }
}

/// Physical sensors on the monitored asset.
///
/// The vibration sensor owns the three axis columns and the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    Temperature,
    Pressure,
    Vibration,
    Level,
}

impl Sensor {
    pub const ALL: [Sensor; 4] = [
        Sensor::Temperature,
        Sensor::Pressure,
        Sensor::Vibration,
        Sensor::Level,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Pressure => "pressure",
            Sensor::Vibration => "vibration",
            Sensor::Level => "level",
        }
    }

    /// Banded value of this sensor in a reading.
    ///
    /// Vibration is judged on its magnitude.
    pub fn value(&self, reading: &Reading) -> Option<f64> {
        match self {
            Sensor::Temperature => reading.temperature,
            Sensor::Pressure => reading.pressure,
            Sensor::Vibration => reading.vibration_mag,
            Sensor::Level => reading.level,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric reading columns usable as detection features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Temperature,
    Pressure,
    VibrationX,
    VibrationY,
    VibrationZ,
    VibrationMag,
    Level,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Temperature,
        Feature::Pressure,
        Feature::VibrationX,
        Feature::VibrationY,
        Feature::VibrationZ,
        Feature::VibrationMag,
        Feature::Level,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Temperature => "temperature",
            Feature::Pressure => "pressure",
            Feature::VibrationX => "vibration_x",
            Feature::VibrationY => "vibration_y",
            Feature::VibrationZ => "vibration_z",
            Feature::VibrationMag => "vibration_mag",
            Feature::Level => "level",
        }
    }

    pub fn value(&self, reading: &Reading) -> Option<f64> {
        match self {
            Feature::Temperature => reading.temperature,
            Feature::Pressure => reading.pressure,
            Feature::VibrationX => reading.vibration_x,
            Feature::VibrationY => reading.vibration_y,
            Feature::VibrationZ => reading.vibration_z,
            Feature::VibrationMag => reading.vibration_mag,
            Feature::Level => reading.level,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown feature '{}'", s.trim()))
    }
}

/// One timestamped multi-sensor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub mode: Mode,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub vibration_x: Option<f64>,
    pub vibration_y: Option<f64>,
    pub vibration_z: Option<f64>,
    pub vibration_mag: Option<f64>,
    pub level: Option<f64>,
}

impl Reading {
    /// Create a reading with every numeric field empty.
    pub fn empty(timestamp: u64, mode: Mode) -> Self {
        Self {
            timestamp,
            mode,
            temperature: None,
            pressure: None,
            vibration_x: None,
            vibration_y: None,
            vibration_z: None,
            vibration_mag: None,
            level: None,
        }
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn with_pressure(mut self, value: f64) -> Self {
        self.pressure = Some(value);
        self
    }

    pub fn with_level(mut self, value: f64) -> Self {
        self.level = Some(value);
        self
    }

    /// Set the three vibration axes; the magnitude is their Euclidean norm.
    pub fn with_vibration(mut self, x: f64, y: f64, z: f64) -> Self {
        self.vibration_x = Some(x);
        self.vibration_y = Some(y);
        self.vibration_z = Some(z);
        self.vibration_mag = Some(magnitude(x, y, z));
        self
    }

    /// Status string mirrored from the mode.
    pub fn status(&self) -> &'static str {
        self.mode.label()
    }

    /// Numeric fields in CSV column order.
    pub fn numeric_fields(&self) -> [Option<f64>; 7] {
        [
            self.temperature,
            self.pressure,
            self.vibration_x,
            self.vibration_y,
            self.vibration_z,
            self.vibration_mag,
            self.level,
        ]
    }

    /// Norm of the axis components, `None` if any axis is null.
    pub fn vibration_norm(&self) -> Option<f64> {
        match (self.vibration_x, self.vibration_y, self.vibration_z) {
            (Some(x), Some(y), Some(z)) => Some(magnitude(x, y, z)),
            _ => None,
        }
    }

    /// Number of null numeric fields.
    pub fn null_count(&self) -> usize {
        self.numeric_fields().iter().filter(|v| v.is_none()).count()
    }

    /// Fraction of numeric fields that are null, in `[0, 1]`.
    pub fn null_fraction(&self) -> f64 {
        self.null_count() as f64 / self.numeric_fields().len() as f64
    }

    pub fn is_complete(&self) -> bool {
        self.null_count() == 0
    }
}

/// Euclidean norm of three axis components.
pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    (x * x + y * y + z * z).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(Mode::from_code(3), None);
    }

    #[test]
    fn test_mode_parse_tokens() {
        assert_eq!("0".parse::<Mode>(), Ok(Mode::Normal));
        assert_eq!(" 2 ".parse::<Mode>(), Ok(Mode::Failure));
        assert_eq!("Alert".parse::<Mode>(), Ok(Mode::Alert));
        assert!("7".parse::<Mode>().is_err());
        assert!("BROKEN".parse::<Mode>().is_err());
    }

    #[test]
    fn test_vibration_magnitude() {
        let reading = Reading::empty(0, Mode::Normal).with_vibration(3.0, 4.0, 0.0);
        assert_eq!(reading.vibration_mag, Some(5.0));
        assert_eq!(reading.vibration_norm(), Some(5.0));
    }

    #[test]
    fn test_null_fraction() {
        let reading = Reading::empty(10, Mode::Failure).with_temperature(50.0);
        assert_eq!(reading.null_count(), 6);
        assert!((reading.null_fraction() - 6.0 / 7.0).abs() < 1e-12);
        assert!(!reading.is_complete());
        assert_eq!(reading.status(), "FAILURE");
    }

    #[test]
    fn test_sensor_value_uses_magnitude() {
        let reading = Reading::empty(0, Mode::Alert).with_vibration(1.0, 0.0, 0.0);
        assert_eq!(Sensor::Vibration.value(&reading), Some(1.0));
        assert_eq!(Sensor::Level.value(&reading), None);
    }

    #[test]
    fn test_feature_parse() {
        assert_eq!("vibration_mag".parse::<Feature>(), Ok(Feature::VibrationMag));
        assert!("humidity".parse::<Feature>().is_err());
    }
}
