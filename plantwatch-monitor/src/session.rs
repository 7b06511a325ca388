// Plantwatch Monitor - Consumer session
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! MonitorSession - window, alerting and connection status of one consumer.
//!
//! A session is an explicit object: independent sessions can run side by
//! side, each with its own window, history and metrics registry. Messages
//! are handled one at a time, in arrival order, through `&mut self`.

use crate::alert::{AlertEvent, AlertHistory, Severity, ANOMALY, NETWORK_FAILURE, SENSOR_FAILURE, TRANSPORT};
use crate::config::MonitorConfig;
use crate::connection::ConnectionState;
use crate::error::Result;
use crate::metrics::SessionMetrics;
use crate::window::Window;
use plantwatch::{parse_live_reading, LiveReading, Mode, Reading, Sensor};
use plantwatch_anomaly::{AnomalyEngine, AnomalyResult, DetectionMethod};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Session shared between the consumer loop and the HTTP feed.
pub type SharedSession = Arc<RwLock<MonitorSession>>;

/// Running counters of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub received: u64,
    pub discarded: u64,
    pub connect_attempts: u64,
    pub connections: u64,
    pub disconnects: u64,
    /// Failed connection attempts since the last successful one.
    pub consecutive_failures: u64,
}

/// Snapshot served on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub version: &'static str,
    pub state: ConnectionState,
    pub uptime_secs: u64,
    pub window_len: usize,
    pub window_capacity: usize,
    pub alerts_retained: usize,
    pub alerts_raised: u64,
    pub stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Reading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_scoring: Option<DetectionMethod>,
}

/// Detection over the window, judged on its newest reading.
#[derive(Debug, Clone)]
struct LiveScorer {
    engine: AnomalyEngine,
    method: DetectionMethod,
}

impl LiveScorer {
    fn score(&self, batch: &[Reading]) -> Option<AnomalyResult> {
        match self.engine.detect(batch, self.method) {
            Ok(results) => results.last().copied(),
            Err(e) => {
                debug!(method = %self.method, error = %e, "live scoring skipped");
                None
            }
        }
    }
}

/// State of one live consumer.
#[derive(Debug)]
pub struct MonitorSession {
    config: MonitorConfig,
    window: Window<Reading>,
    alerts: AlertHistory,
    state: ConnectionState,
    stats: SessionStats,
    scorer: Option<LiveScorer>,
    metrics: SessionMetrics,
    started: Instant,
}

impl MonitorSession {
    /// Create a session. Fails on an invalid configuration.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;

        let scorer = match &config.live_scoring {
            Some(scoring) => Some(LiveScorer {
                engine: AnomalyEngine::new(scoring.params.clone())?,
                method: scoring.method,
            }),
            None => None,
        };

        let metrics = SessionMetrics::new()?;
        metrics.set_connection_state(ConnectionState::Connecting);

        Ok(Self {
            window: Window::new(config.window_capacity),
            alerts: AlertHistory::new(config.alert_history),
            state: ConnectionState::Connecting,
            stats: SessionStats::default(),
            scorer,
            metrics,
            started: Instant::now(),
            config,
        })
    }

    /// Wrap the session for sharing with the consumer loop and HTTP feed.
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    // ========================================================================
    // Message handling
    // ========================================================================

    /// Handle one raw JSON line. Malformed lines are counted and dropped.
    pub fn handle_line(&mut self, line: &str) -> Vec<AlertEvent> {
        match parse_live_reading(line) {
            Ok(live) => self.handle(live),
            Err(e) => {
                self.stats.discarded += 1;
                self.metrics.record_discard();
                warn!(error = %e, "discarding stream message");
                Vec::new()
            }
        }
    }

    /// Handle one arrival: update the window, then raise its alerts.
    pub fn handle(&mut self, live: LiveReading) -> Vec<AlertEvent> {
        self.stats.received += 1;
        self.window.push(live.reading.clone());
        self.metrics.record_reading(self.window.len());

        let mut raised = self.evaluate(&live);
        if let Some(alert) = self.score_latest() {
            raised.push(alert);
        }
        for alert in &raised {
            self.record(alert.clone());
        }
        raised
    }

    /// Alerts for a reading, without touching session state.
    ///
    /// Failure indicators come first, then one alert at most per sensor,
    /// CRITICAL taking precedence over WARNING. Null values are not checked
    /// against bands.
    pub fn evaluate(&self, live: &LiveReading) -> Vec<AlertEvent> {
        let reading = &live.reading;
        let mut alerts = Vec::new();

        if live.network_failure {
            alerts.push(AlertEvent::critical(
                reading.timestamp,
                NETWORK_FAILURE,
                "device reported network failure",
            ));
        }

        let null_fraction = reading.null_fraction();
        if reading.mode == Mode::Failure || live.sensor_failure || null_fraction > self.config.max_null_fraction {
            alerts.push(AlertEvent::critical(
                reading.timestamp,
                SENSOR_FAILURE,
                format!(
                    "sensor failure: mode {}, {} of {} fields null",
                    reading.mode,
                    reading.null_count(),
                    reading.numeric_fields().len()
                ),
            ));
        }

        for sensor in Sensor::ALL {
            let (Some(band), Some(value)) = (self.config.thresholds.band(sensor), sensor.value(reading)) else {
                continue;
            };
            if let Some(violation) = band.check(value) {
                let kind = match violation.severity {
                    Severity::Critical => "critical",
                    Severity::Warning => "warning",
                };
                alerts.push(AlertEvent::new(
                    reading.timestamp,
                    violation.severity,
                    sensor.as_str(),
                    format!(
                        "{} {:.2} {} {} limit {:.2}",
                        sensor, value, violation.direction, kind, violation.limit
                    ),
                ));
            }
        }

        alerts
    }

    fn score_latest(&self) -> Option<AlertEvent> {
        let scorer = self.scorer.as_ref()?;
        let batch = self.window.to_vec();
        let result = scorer.score(&batch)?;
        if !result.is_anomaly || result.is_null_row() {
            return None;
        }
        let timestamp = batch.last().map_or(0, |r| r.timestamp);
        Some(AlertEvent::warning(
            timestamp,
            ANOMALY,
            format!("{} flagged reading (score {:.3})", scorer.method, result.score),
        ))
    }

    fn record(&mut self, alert: AlertEvent) {
        match alert.severity {
            Severity::Critical => warn!(sensor = %alert.sensor, "{}", alert.message),
            Severity::Warning => info!(sensor = %alert.sensor, "{}", alert.message),
        }
        self.metrics.record_alert(alert.severity);
        self.alerts.record(alert);
    }

    // ========================================================================
    // Connection status
    // ========================================================================

    pub fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "connection state");
        }
        self.state = state;
        self.metrics.set_connection_state(state);
    }

    /// A connection attempt is starting.
    pub fn connect_attempt(&mut self) {
        self.stats.connect_attempts += 1;
        if self.stats.connect_attempts > 1 {
            self.metrics.record_reconnect();
        }
        self.set_state(ConnectionState::Connecting);
    }

    pub fn connected(&mut self) {
        self.stats.connections += 1;
        self.stats.consecutive_failures = 0;
        self.set_state(ConnectionState::Connected);
    }

    /// A connection attempt failed. Only the first failure of a streak
    /// raises an alert.
    pub fn connect_failed(&mut self, reason: &str) -> Option<AlertEvent> {
        self.stats.consecutive_failures += 1;
        self.set_state(ConnectionState::Backoff);
        if self.stats.consecutive_failures > 1 {
            return None;
        }
        let alert = AlertEvent::warning(wall_clock_secs(), TRANSPORT, format!("stream unavailable: {}", reason));
        self.record(alert.clone());
        Some(alert)
    }

    /// An established connection dropped.
    pub fn connection_lost(&mut self, reason: &str) -> AlertEvent {
        self.stats.disconnects += 1;
        self.set_state(ConnectionState::Backoff);
        let alert = AlertEvent::warning(wall_clock_secs(), TRANSPORT, format!("connection lost: {}", reason));
        self.record(alert.clone());
        alert
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn window(&self) -> &Window<Reading> {
        &self.window
    }

    pub fn alerts(&self) -> &AlertHistory {
        &self.alerts
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            version: crate::VERSION,
            state: self.state,
            uptime_secs: self.started.elapsed().as_secs(),
            window_len: self.window.len(),
            window_capacity: self.window.capacity(),
            alerts_retained: self.alerts.len(),
            alerts_raised: self.alerts.total_raised(),
            stats: self.stats,
            latest: self.window.latest().cloned(),
            live_scoring: self.scorer.as_ref().map(|s| s.method),
        }
    }
}

fn wall_clock_secs() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiveScoringConfig;

    fn live(reading: Reading) -> LiveReading {
        LiveReading {
            reading,
            sensor_failure: false,
            network_failure: false,
        }
    }

    fn nominal(ts: u64) -> Reading {
        Reading::empty(ts, Mode::Normal)
            .with_temperature(25.0)
            .with_pressure(5.0)
            .with_vibration(0.3, 0.2, 0.1)
            .with_level(100.0)
    }

    #[test]
    fn test_nominal_reading_raises_nothing() {
        let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
        assert!(session.handle(live(nominal(1))).is_empty());
        assert_eq!(session.stats().received, 1);
        assert_eq!(session.window().len(), 1);
    }

    #[test]
    fn test_each_sensor_alerts_independently() {
        let session = MonitorSession::new(MonitorConfig::default()).unwrap();
        let mut reading = nominal(1);
        reading.temperature = Some(35.0);
        reading.level = Some(200.0);

        let alerts = session.evaluate(&live(reading));
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].sensor, "temperature");
        assert_eq!(alerts[0].severity, Severity::Warning);
        assert_eq!(alerts[1].sensor, "level");
        assert_eq!(alerts[1].severity, Severity::Critical);
        assert_eq!(alerts[1].message, "level 200.00 above critical limit 170.00");
    }

    #[test]
    fn test_failure_mode_raises_sensor_failure() {
        let session = MonitorSession::new(MonitorConfig::default()).unwrap();
        let reading = Reading::empty(9, Mode::Failure).with_temperature(25.0);

        let alerts = session.evaluate(&live(reading));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor, SENSOR_FAILURE);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_null_fraction_raises_sensor_failure() {
        let session = MonitorSession::new(MonitorConfig::default()).unwrap();
        // 4 of 7 fields null in NORMAL mode.
        let reading = Reading::empty(2, Mode::Normal)
            .with_temperature(25.0)
            .with_pressure(5.0)
            .with_level(100.0);
        let alerts = session.evaluate(&live(reading));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor, SENSOR_FAILURE);

        // 3 of 7 null is under the limit; nulls skip the band check.
        let mut reading = nominal(3);
        reading.vibration_x = None;
        reading.vibration_y = None;
        reading.vibration_mag = None;
        assert!(session.evaluate(&live(reading)).is_empty());
    }

    #[test]
    fn test_network_failure_is_distinct() {
        let session = MonitorSession::new(MonitorConfig::default()).unwrap();
        let mut arrival = live(nominal(4));
        arrival.network_failure = true;

        let alerts = session.evaluate(&arrival);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor, NETWORK_FAILURE);
        assert_eq!(alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_malformed_line_counted() {
        let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
        assert!(session.handle_line("{broken").is_empty());
        assert_eq!(session.stats().discarded, 1);
        assert_eq!(session.stats().received, 0);
    }

    #[test]
    fn test_connect_failure_streak_alerts_once() {
        let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
        assert!(session.connect_failed("refused").is_some());
        assert!(session.connect_failed("refused").is_none());
        session.connected();
        assert!(session.connect_failed("refused").is_some());
        assert_eq!(session.alerts().len(), 2);
    }

    #[test]
    fn test_live_scoring_flags_spike() {
        let config = MonitorConfig::new()
            .with_window_capacity(30)
            .with_live_scoring(LiveScoringConfig::new(DetectionMethod::ZScore));
        let mut session = MonitorSession::new(config).unwrap();

        for i in 0..29 {
            let mut reading = nominal(i);
            reading.temperature = Some(25.0 + (i % 3) as f64 * 0.2);
            assert!(session.handle(live(reading)).is_empty());
        }
        // Within the threshold bands but far outside the window's spread.
        let mut spike = nominal(29);
        spike.temperature = Some(29.5);
        let alerts = session.handle(live(spike));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor, ANOMALY);
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_status_snapshot() {
        let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
        session.handle(live(nominal(7)));
        let status = session.status();
        assert_eq!(status.window_len, 1);
        assert_eq!(status.window_capacity, 20);
        assert_eq!(status.latest.unwrap().timestamp, 7);
        assert_eq!(status.state, ConnectionState::Connecting);
    }
}
