// Plantwatch Monitor - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for a consumer session.
//!
//! Every session owns its registry, so independent sessions never share
//! counters.

use crate::alert::Severity;
use crate::connection::ConnectionState;
use crate::error::{MonitorError, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Metrics of one session.
#[derive(Clone)]
pub struct SessionMetrics {
    registry: Registry,
    readings_received: IntCounter,
    messages_discarded: IntCounter,
    alerts: IntCounterVec,
    reconnect_attempts: IntCounter,
    connection_state: IntGauge,
    window_len: IntGauge,
}

impl SessionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        // ============================================================
        // Stream
        // ============================================================

        let readings_received = IntCounter::new(
            "plantwatch_readings_received_total",
            "Readings accepted from the live stream",
        )?;
        let messages_discarded = IntCounter::new(
            "plantwatch_messages_discarded_total",
            "Stream messages discarded as malformed",
        )?;
        let window_len = IntGauge::new(
            "plantwatch_window_readings",
            "Readings currently held in the visualization window",
        )?;

        // ============================================================
        // Alerts
        // ============================================================

        let alerts = IntCounterVec::new(
            Opts::new("plantwatch_alerts_total", "Alerts raised, by severity"),
            &["severity"],
        )?;

        // ============================================================
        // Connection
        // ============================================================

        let reconnect_attempts = IntCounter::new(
            "plantwatch_reconnect_attempts_total",
            "Connection attempts after the first",
        )?;
        let connection_state = IntGauge::new(
            "plantwatch_connection_state",
            "Connection state (0=Connecting, 1=Connected, 2=Backoff, 3=Shutdown)",
        )?;

        registry.register(Box::new(readings_received.clone()))?;
        registry.register(Box::new(messages_discarded.clone()))?;
        registry.register(Box::new(window_len.clone()))?;
        registry.register(Box::new(alerts.clone()))?;
        registry.register(Box::new(reconnect_attempts.clone()))?;
        registry.register(Box::new(connection_state.clone()))?;

        Ok(Self {
            registry,
            readings_received,
            messages_discarded,
            alerts,
            reconnect_attempts,
            connection_state,
            window_len,
        })
    }

    pub fn record_reading(&self, window_len: usize) {
        self.readings_received.inc();
        self.window_len.set(window_len as i64);
    }

    pub fn record_discard(&self) {
        self.messages_discarded.inc();
    }

    pub fn record_alert(&self, severity: Severity) {
        self.alerts.with_label_values(&[severity.as_str()]).inc();
    }

    pub fn record_reconnect(&self) {
        self.reconnect_attempts.inc();
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        self.connection_state.set(state.code());
    }

    /// Encode the session's metrics to Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MonitorError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

impl std::fmt::Debug for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMetrics")
            .field("readings_received", &self.readings_received.get())
            .field("messages_discarded", &self.messages_discarded.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        let metrics = SessionMetrics::new().unwrap();
        metrics.record_reading(3);
        metrics.record_alert(Severity::Critical);
        metrics.set_connection_state(ConnectionState::Connected);

        let output = metrics.encode().unwrap();
        assert!(output.contains("plantwatch_readings_received_total 1"));
        assert!(output.contains("plantwatch_alerts_total{severity=\"CRITICAL\"} 1"));
        assert!(output.contains("plantwatch_connection_state 1"));
        assert!(output.contains("plantwatch_window_readings 3"));
    }

    #[test]
    fn test_sessions_do_not_share_registries() {
        let a = SessionMetrics::new().unwrap();
        let b = SessionMetrics::new().unwrap();
        a.record_discard();
        assert!(a.encode().unwrap().contains("plantwatch_messages_discarded_total 1"));
        assert!(b.encode().unwrap().contains("plantwatch_messages_discarded_total 0"));
    }
}
