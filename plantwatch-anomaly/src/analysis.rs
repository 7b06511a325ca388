// Plantwatch Anomaly - Descriptive statistics
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-sensor descriptive statistics of a reading batch, overall and for
//! each operating mode present in it.
//!
//! Moments are population moments: `std` divides by `n`, skewness is
//! `m3 / m2^1.5` and kurtosis is the excess `m4 / m2^2 - 3`. Quartiles use
//! the same linear interpolation as the IQR detector. A column with no
//! values reports NaN (`null` in JSON); a column with zero spread reports
//! skewness and kurtosis of 0.

use crate::stats;
use plantwatch::{Feature, Mode, Reading};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Columns reported when no feature list is given.
pub const SENSOR_FEATURES: [Feature; 4] = [
    Feature::Temperature,
    Feature::Pressure,
    Feature::VibrationMag,
    Feature::Level,
];

/// Statistics of one feature column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStatistics {
    /// Non-null values.
    pub count: usize,
    pub null_count: usize,
    /// Nulls as a percentage of all rows.
    pub null_percent: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl FeatureStatistics {
    pub fn from_values(values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let null_count = values.len() - present.len();
        let null_percent = if values.is_empty() {
            0.0
        } else {
            null_count as f64 / values.len() as f64 * 100.0
        };

        if present.is_empty() {
            return Self {
                count: 0,
                null_count,
                null_percent,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                q1: f64::NAN,
                q3: f64::NAN,
                iqr: f64::NAN,
                skewness: f64::NAN,
                kurtosis: f64::NAN,
            };
        }

        let sorted = stats::sorted(&present);
        let mean = stats::mean(&present);
        let std = stats::std_dev(&present);
        let q1 = stats::quantile(&sorted, 0.25);
        let q3 = stats::quantile(&sorted, 0.75);
        let (skewness, kurtosis) = shape(&present, mean);

        Self {
            count: present.len(),
            null_count,
            null_percent,
            mean,
            std,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: stats::quantile(&sorted, 0.5),
            q1,
            q3,
            iqr: q3 - q1,
            skewness,
            kurtosis,
        }
    }
}

/// Population skewness and excess kurtosis.
fn shape(values: &[f64], mean: f64) -> (f64, f64) {
    let n = values.len() as f64;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), x| {
        let d = x - mean;
        let d2 = d * d;
        (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
    });
    let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
    if m2 <= 0.0 {
        return (0.0, 0.0);
    }
    (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

/// Statistics of the rows of one mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeStatistics {
    pub mode: Mode,
    pub rows: usize,
    pub features: BTreeMap<Feature, FeatureStatistics>,
}

/// Statistics report of a reading batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatistics {
    pub rows: usize,
    pub features: BTreeMap<Feature, FeatureStatistics>,
    /// Modes present in the batch, in [`Mode::ALL`] order.
    pub by_mode: Vec<ModeStatistics>,
}

impl BatchStatistics {
    /// Report over `features`, or [`SENSOR_FEATURES`] when empty.
    pub fn from_readings(batch: &[Reading], features: &[Feature]) -> Self {
        let features = if features.is_empty() { &SENSOR_FEATURES[..] } else { features };

        let by_mode = Mode::ALL
            .iter()
            .filter_map(|&mode| {
                let rows: Vec<&Reading> = batch.iter().filter(|r| r.mode == mode).collect();
                if rows.is_empty() {
                    return None;
                }
                Some(ModeStatistics {
                    mode,
                    rows: rows.len(),
                    features: columns(rows.iter().copied(), features),
                })
            })
            .collect();

        Self {
            rows: batch.len(),
            features: columns(batch.iter(), features),
            by_mode,
        }
    }

    pub fn feature(&self, feature: Feature) -> Option<&FeatureStatistics> {
        self.features.get(&feature)
    }

    pub fn mode(&self, mode: Mode) -> Option<&ModeStatistics> {
        self.by_mode.iter().find(|m| m.mode == mode)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn columns<'a>(
    rows: impl Iterator<Item = &'a Reading> + Clone,
    features: &[Feature],
) -> BTreeMap<Feature, FeatureStatistics> {
    features
        .iter()
        .map(|&feature| {
            let values: Vec<Option<f64>> = rows.clone().map(|r| feature.value(r)).collect();
            (feature, FeatureStatistics::from_values(&values))
        })
        .collect()
}

impl fmt::Display for FeatureStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} nulls={} ({:.1}%) mean={:.3} std={:.3} min={:.3} max={:.3} \
             median={:.3} q1={:.3} q3={:.3} iqr={:.3} skew={:.3} kurtosis={:.3}",
            self.count,
            self.null_count,
            self.null_percent,
            self.mean,
            self.std,
            self.min,
            self.max,
            self.median,
            self.q1,
            self.q3,
            self.iqr,
            self.skewness,
            self.kurtosis
        )
    }
}

impl fmt::Display for BatchStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows", self.rows)?;
        for (feature, s) in &self.features {
            writeln!(f, "  {}: {}", feature, s)?;
        }
        for mode in &self.by_mode {
            writeln!(f, "{}: {} rows", mode.mode, mode.rows)?;
            for (feature, s) in &mode.features {
                writeln!(f, "  {}: {}", feature, s)?;
            }
        }
        Ok(())
    }
}
