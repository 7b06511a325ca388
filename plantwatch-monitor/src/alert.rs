// Plantwatch Monitor - Alert events
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Alert events and the bounded alert history.

use crate::window::Window;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pseudo-sensor for readings the device marks as sensor failures.
pub const SENSOR_FAILURE: &str = "sensors";
/// Pseudo-sensor for device-reported network failures.
pub const NETWORK_FAILURE: &str = "network";
/// Pseudo-sensor for stream connection loss.
pub const TRANSPORT: &str = "transport";
/// Pseudo-sensor for live-scoring anomalies.
pub const ANOMALY: &str = "anomaly";

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raised alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Reading timestamp, or wall-clock seconds for connection alerts.
    pub timestamp: u64,
    pub severity: Severity,
    pub message: String,
    /// Sensor name, or one of the pseudo-sensors in this module.
    pub sensor: String,
}

impl AlertEvent {
    pub fn new(timestamp: u64, severity: Severity, sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            severity,
            message: message.into(),
            sensor: sensor.into(),
        }
    }

    pub fn warning(timestamp: u64, sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(timestamp, Severity::Warning, sensor, message)
    }

    pub fn critical(timestamp: u64, sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(timestamp, Severity::Critical, sensor, message)
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}: {}", self.severity, self.timestamp, self.sensor, self.message)
    }
}

/// Most recent alerts, oldest evicted first. Repeats are kept.
#[derive(Debug, Clone)]
pub struct AlertHistory {
    events: Window<AlertEvent>,
    raised: u64,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Window::new(capacity),
            raised: 0,
        }
    }

    pub fn record(&mut self, event: AlertEvent) {
        self.raised += 1;
        self.events.push(event);
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AlertEvent> + ExactSizeIterator {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<AlertEvent> {
        self.events.to_vec()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Alerts raised over the session, including evicted ones.
    pub fn total_raised(&self) -> u64 {
        self.raised
    }

    pub fn latest(&self) -> Option<&AlertEvent> {
        self.events.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_bounded_without_dedup() {
        let mut history = AlertHistory::new(10);
        for i in 0..15 {
            history.record(AlertEvent::critical(i, "temperature", "same violation"));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.total_raised(), 15);
        assert_eq!(history.iter().next().unwrap().timestamp, 5);
        assert_eq!(history.latest().unwrap().timestamp, 14);
    }

    #[test]
    fn test_severity_serialization() {
        let event = AlertEvent::warning(3, "level", "level 125.00 above warning maximum 120.00");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"severity\":\"WARNING\""));
        assert_eq!(
            event.to_string(),
            "[WARNING] 3 level: level 125.00 above warning maximum 120.00"
        );
    }
}
