// Plantwatch Anomaly - Feature extraction
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reading batches to numeric feature rows.
//!
//! Rows with a null in any selected feature stay out of the matrix. They are
//! remembered by index so the engine can still report them.

use crate::error::{ConfigurationError, Result};
use plantwatch::{Feature, Reading};
use serde::{Deserialize, Serialize};

/// Which columns to feed to a detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Every numeric column holding at least one value in the batch.
    #[default]
    Auto,
    /// A fixed list of columns.
    Explicit(Vec<Feature>),
}

impl FeatureSelection {
    pub fn explicit(features: &[Feature]) -> Result<Self> {
        let selection = FeatureSelection::Explicit(features.to_vec());
        selection.check()?;
        Ok(selection)
    }

    fn check(&self) -> Result<()> {
        if let FeatureSelection::Explicit(features) = self {
            if features.is_empty() {
                return Err(ConfigurationError::EmptyFeatureSet);
            }
            for (i, f) in features.iter().enumerate() {
                if features[..i].contains(f) {
                    return Err(ConfigurationError::DuplicateFeature(*f));
                }
            }
        }
        Ok(())
    }

    /// Features used for this batch.
    pub fn resolve(&self, batch: &[Reading]) -> Result<Vec<Feature>> {
        self.check()?;
        let features = match self {
            FeatureSelection::Explicit(features) => features.clone(),
            FeatureSelection::Auto => Feature::ALL
                .iter()
                .copied()
                .filter(|f| batch.iter().any(|r| f.value(r).is_some()))
                .collect(),
        };
        if features.is_empty() {
            return Err(ConfigurationError::EmptyFeatureSet);
        }
        Ok(features)
    }
}

/// Complete rows of a batch over the selected features.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    features: Vec<Feature>,
    rows: Vec<Vec<f64>>,
    row_index: Vec<usize>,
    total: usize,
}

impl FeatureMatrix {
    pub fn build(batch: &[Reading], selection: &FeatureSelection) -> Result<Self> {
        let features = selection.resolve(batch)?;
        let mut rows = Vec::with_capacity(batch.len());
        let mut row_index = Vec::with_capacity(batch.len());

        for (i, reading) in batch.iter().enumerate() {
            let values: Option<Vec<f64>> = features.iter().map(|f| f.value(reading)).collect();
            if let Some(values) = values {
                rows.push(values);
                row_index.push(i);
            }
        }

        Ok(Self {
            features,
            rows,
            row_index,
            total: batch.len(),
        })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn dimensions(&self) -> usize {
        self.features.len()
    }

    /// Complete rows, in batch order.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Batch index of each complete row.
    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }

    /// Number of rows in the original batch.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn complete(&self) -> usize {
        self.rows.len()
    }

    pub fn null_rows(&self) -> usize {
        self.total - self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantwatch::Mode;

    fn batch() -> Vec<Reading> {
        vec![
            Reading::empty(0, Mode::Normal).with_temperature(20.0).with_pressure(5.0),
            Reading::empty(1, Mode::Failure).with_pressure(9.0),
            Reading::empty(2, Mode::Normal).with_temperature(22.0).with_pressure(5.5),
        ]
    }

    #[test]
    fn test_auto_skips_empty_columns() {
        let matrix = FeatureMatrix::build(&batch(), &FeatureSelection::Auto).unwrap();
        assert_eq!(matrix.features(), &[Feature::Temperature, Feature::Pressure]);
        assert_eq!(matrix.complete(), 2);
        assert_eq!(matrix.null_rows(), 1);
        assert_eq!(matrix.row_index(), &[0, 2]);
        assert_eq!(matrix.rows()[1], vec![22.0, 5.5]);
    }

    #[test]
    fn test_explicit_subset() {
        let selection = FeatureSelection::explicit(&[Feature::Pressure]).unwrap();
        let matrix = FeatureMatrix::build(&batch(), &selection).unwrap();
        assert_eq!(matrix.complete(), 3);
    }

    #[test]
    fn test_invalid_selections() {
        assert_eq!(
            FeatureSelection::explicit(&[]).unwrap_err(),
            ConfigurationError::EmptyFeatureSet
        );
        assert_eq!(
            FeatureSelection::explicit(&[Feature::Level, Feature::Level]).unwrap_err(),
            ConfigurationError::DuplicateFeature(Feature::Level)
        );

        let all_null = vec![Reading::empty(0, Mode::Failure)];
        assert_eq!(
            FeatureMatrix::build(&all_null, &FeatureSelection::Auto).unwrap_err(),
            ConfigurationError::EmptyFeatureSet
        );
    }
}
