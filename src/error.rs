//! Error types for plantwatch
//!
//! Record-level problems are [`ValidationError`]s: the offending line is
//! dropped and the stream keeps going. Layout problems are [`IngestError`]s
//! and are raised before any line is read.

use thiserror::Error;

/// Result type alias for ingestion setup
pub type Result<T> = std::result::Result<T, IngestError>;

/// A malformed input record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Wrong number of delimited fields
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// Timestamp is not a non-negative integer
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    /// Mode token is not one of the known modes
    #[error("unknown mode token '{0}'")]
    UnknownMode(String),

    /// Numeric column could not be parsed
    #[error("invalid value '{value}' for column {column}")]
    InvalidNumber { column: &'static str, value: String },

    /// Null sentinel in a column that can never be null
    #[error("column {0} cannot be null")]
    NullNotAllowed(&'static str),

    /// Status column disagrees with the mode column
    #[error("status '{status}' does not match mode {mode}")]
    StatusMismatch { status: String, mode: String },

    /// Streaming message is not valid JSON for the message schema
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Invalid ingestor configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// A required column is absent from the layout
    #[error("column layout is missing required column {0}")]
    MissingColumn(&'static str),

    /// A column appears more than once
    #[error("column {0} appears more than once in the layout")]
    DuplicateColumn(&'static str),

    /// Null token collides with the delimiter or is empty
    #[error("invalid null token '{0}'")]
    InvalidNullToken(String),
}
