// Plantwatch Testdata - Mode selection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Which modes a generation run covers.

use crate::generator::GeneratorError;
use plantwatch::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mode selector of a generation run.
///
/// `All` produces one contiguous block per mode, in NORMAL, ALERT, FAILURE
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSelector {
    Single(Mode),
    All,
}

impl ModeSelector {
    /// Modes in block order.
    pub fn modes(&self) -> Vec<Mode> {
        match self {
            ModeSelector::Single(mode) => vec![*mode],
            ModeSelector::All => Mode::ALL.to_vec(),
        }
    }
}

impl From<Mode> for ModeSelector {
    fn from(mode: Mode) -> Self {
        ModeSelector::Single(mode)
    }
}

impl fmt::Display for ModeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSelector::Single(mode) => write!(f, "{}", mode),
            ModeSelector::All => f.write_str("ALL"),
        }
    }
}

impl FromStr for ModeSelector {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ModeSelector::All);
        }
        s.parse::<Mode>()
            .map(ModeSelector::Single)
            .map_err(|_| {
                GeneratorError::Configuration(format!(
                    "unknown mode selector '{}', expected normal, alert, failure or all",
                    s.trim()
                ))
            })
    }
}
