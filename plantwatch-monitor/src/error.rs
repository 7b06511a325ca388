// Plantwatch Monitor - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the live consumer.

use plantwatch::Sensor;
use plantwatch_anomaly::ConfigurationError;
use std::io;
use thiserror::Error;

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Fatal monitor errors, raised before a session starts consuming.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("invalid monitor configuration: {0}")]
    Config(String),

    #[error("invalid threshold band for {sensor}: {reason}")]
    InvalidBand { sensor: Sensor, reason: String },

    #[error("live scoring: {0}")]
    Scoring(#[from] ConfigurationError),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Stream connection failures.
///
/// Transient: the consumer backs off and reconnects.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connect to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("stream closed by peer")]
    Closed,

    #[error("stream read failed: {0}")]
    Io(#[from] io::Error),
}
