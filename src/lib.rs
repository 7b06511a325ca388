//! # plantwatch - industrial sensor telemetry
//!
//! Shared record model and ingestion layer for the plantwatch pipeline.
//!
//! ## Key Features
//!
//! - **Reading model**: timestamped temperature, pressure, vibration and level
//!   observations tagged with an operating [`Mode`]
//! - **CSV schema**: exact, round-trippable flat-file interchange
//! - **Streaming schema**: JSON messages as published by field devices
//! - **Ingestor**: lazy, validating line parser that never halts on bad input
//!
//! ## Quick Start
//!
//! ```rust
//! use plantwatch::{format_line, IngestConfig, Ingestor, Mode, Reading, HEADER};
//!
//! let reading = Reading::empty(1_706_745_600, Mode::Normal)
//!     .with_temperature(24.5)
//!     .with_pressure(5.0)
//!     .with_vibration(0.3, 0.0, 0.4)
//!     .with_level(101.0);
//!
//! let lines = vec![HEADER.to_string(), format_line(&reading)];
//! let parsed: Vec<Reading> = Ingestor::new(lines, IngestConfig::default())
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(parsed, vec![reading]);
//! ```
//!
//! ## Modules
//!
//! - [`reading`]: Reading, Mode, Sensor and Feature types
//! - [`schema`]: CSV column layout and writer
//! - [`message`]: JSON streaming message schema
//! - [`ingest`]: Line ingestion and validation

pub mod error;
pub mod ingest;
pub mod message;
pub mod reading;
pub mod schema;

pub use error::{IngestError, Result, ValidationError};
pub use ingest::{IngestConfig, IngestStats, Ingestor, LineParser, ReaderLines};
pub use message::{parse_live_reading, LiveReading, StreamMessage};
pub use reading::{magnitude, Feature, Mode, Reading, Sensor, UnknownMode};
pub use schema::{format_line, header_for, Column, ReadingWriter, DELIMITER, HEADER, NULL_TOKEN};
