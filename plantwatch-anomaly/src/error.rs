// Plantwatch Anomaly - Error types
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Detection errors.
//!
//! All of these are raised before a method touches the batch.

use crate::method::DetectionMethod;
use plantwatch::Feature;
use thiserror::Error;

/// Result type for detection calls.
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Invalid detection request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Method name outside the closed set.
    #[error("unknown detection method '{name}', expected one of: {valid}")]
    UnknownMethod { name: String, valid: String },

    /// Parameter out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Not enough complete rows for the method.
    #[error("{method} needs at least {minimum} complete rows, got {actual}")]
    BatchTooSmall {
        method: DetectionMethod,
        minimum: usize,
        actual: usize,
    },

    /// No usable feature columns.
    #[error("no feature columns selected")]
    EmptyFeatureSet,

    /// A feature was selected twice.
    #[error("feature {0} selected more than once")]
    DuplicateFeature(Feature),
}
