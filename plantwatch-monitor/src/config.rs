// Plantwatch Monitor - Session configuration
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monitor configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "window_capacity": 20,
//!   "alert_history": 10,
//!   "reconnect_backoff_secs": 5,
//!   "max_null_fraction": 0.5,
//!   "thresholds": {
//!     "temperature": {"min": 10, "warning_min": 20, "warning_max": 30, "max": 40}
//!   },
//!   "live_scoring": {"method": "zscore", "params": {"threshold": 3.0}}
//! }
//! ```
//!
//! Missing keys take their defaults.

use crate::error::{MonitorError, Result};
use crate::threshold::Thresholds;
use plantwatch::Feature;
use plantwatch_anomaly::{DetectionMethod, DetectorParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Detection run over the window on every arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveScoringConfig {
    pub method: DetectionMethod,
    #[serde(default)]
    pub params: DetectorParams,
}

impl LiveScoringConfig {
    pub fn new(method: DetectionMethod) -> Self {
        Self {
            method,
            params: DetectorParams::default(),
        }
    }

    pub fn with_params(mut self, params: DetectorParams) -> Self {
        self.params = params;
        self
    }
}

/// Configuration of one consumer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Readings kept for visualization.
    pub window_capacity: usize,
    /// Alerts kept in the history.
    pub alert_history: usize,
    /// Fixed delay between reconnect attempts.
    pub reconnect_backoff_secs: u64,
    /// A reading with more than this fraction of null fields is a sensor failure.
    pub max_null_fraction: f64,
    pub thresholds: Thresholds,
    pub live_scoring: Option<LiveScoringConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: 20,
            alert_history: 10,
            reconnect_backoff_secs: 5,
            max_null_fraction: 0.5,
            thresholds: Thresholds::default(),
            live_scoring: None,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    pub fn with_alert_history(mut self, capacity: usize) -> Self {
        self.alert_history = capacity;
        self
    }

    pub fn with_reconnect_backoff_secs(mut self, secs: u64) -> Self {
        self.reconnect_backoff_secs = secs;
        self
    }

    pub fn with_max_null_fraction(mut self, fraction: f64) -> Self {
        self.max_null_fraction = fraction;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_live_scoring(mut self, scoring: LiveScoringConfig) -> Self {
        self.live_scoring = Some(scoring);
        self
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            return Err(MonitorError::Config("window_capacity must be positive".to_string()));
        }
        if self.alert_history == 0 {
            return Err(MonitorError::Config("alert_history must be positive".to_string()));
        }
        if self.reconnect_backoff_secs == 0 {
            return Err(MonitorError::Config(
                "reconnect_backoff_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_null_fraction) {
            return Err(MonitorError::Config(format!(
                "max_null_fraction must be within [0, 1], got {}",
                self.max_null_fraction
            )));
        }
        self.thresholds.validate()?;

        if let Some(scoring) = &self.live_scoring {
            scoring.params.validate()?;
            let minimum = scoring.method.min_rows(&scoring.params, Feature::ALL.len());
            if minimum > self.window_capacity {
                return Err(MonitorError::Config(format!(
                    "{} needs {} rows but the window holds {}",
                    scoring.method, minimum, self.window_capacity
                )));
            }
        }
        Ok(())
    }
}
