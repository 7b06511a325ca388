// Plantwatch Monitor - Live telemetry consumer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Plantwatch Monitor
//!
//! Live consumer of the plant reading stream.
//!
//! - **Session**: bounded visualization window, threshold alerting, alert
//!   history and optional live anomaly scoring
//! - **Consumer**: reconnect state machine with fixed backoff and explicit
//!   shutdown
//! - **Transports**: newline-delimited JSON over TCP, scripted in-memory
//! - **Feed**: HTTP endpoints and per-session Prometheus metrics
//! - **Publisher**: TCP fan-out of generated or recorded readings
//!
//! ## Example
//!
//! ```rust
//! use plantwatch_monitor::{MonitorConfig, MonitorSession, Severity};
//!
//! let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
//! let line = r#"{"timestamp": 1, "temperature": 47.5, "pressure": 5.0,
//!     "vibration": 0.4, "level": 100.0, "accel_x": 0.4, "accel_y": 0.0,
//!     "accel_z": 0.0, "sensor_failure": false, "network_failure": false}"#;
//!
//! let alerts = session.handle_line(line);
//! assert_eq!(alerts.len(), 1);
//! assert_eq!(alerts[0].severity, Severity::Critical);
//! assert_eq!(alerts[0].sensor, "temperature");
//! ```

pub mod alert;
pub mod config;
pub mod connection;
pub mod error;
pub mod metrics;
pub mod publish;
pub mod server;
pub mod session;
pub mod threshold;
pub mod transport;
pub mod window;

pub use alert::{AlertEvent, AlertHistory, Severity};
pub use config::{LiveScoringConfig, MonitorConfig};
pub use connection::{shutdown_channel, wait_for_shutdown, ConnectionState, ShutdownHandle, StreamConsumer};
pub use error::{MonitorError, Result, TransportError};
pub use metrics::SessionMetrics;
pub use publish::{PublishStats, Publisher, PublisherConfig};
pub use session::{MonitorSession, SessionStats, SessionStatus, SharedSession};
pub use threshold::{Direction, ThresholdBand, Thresholds, Violation};
pub use transport::{MemoryTransport, ScriptStep, Subscription, TcpTransport, Transport};
pub use window::Window;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
