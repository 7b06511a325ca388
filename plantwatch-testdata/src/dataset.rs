// Plantwatch Testdata - Dataset structures
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dataset structures and I/O operations.
//!
//! CSV files use the plantwatch interchange schema and are read back through
//! the validating [`Ingestor`], so a file that round-trips here is also
//! accepted by every other stage of the pipeline.

use chrono::{DateTime, Utc};
use plantwatch::{IngestConfig, IngestError, Ingestor, Mode, Reading, ReadingWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Dataset error types.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: u64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ingest layout error: {0}")]
    Layout(#[from] IngestError),
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Generation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Mode selector used to generate the data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Generation seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Sample interval in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Configured injection rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection_rate: Option<f64>,
}

/// An ordered collection of readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings,
            metadata: DatasetMetadata::default(),
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: DatasetMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings of one mode.
    pub fn by_mode(&self, mode: Mode) -> impl Iterator<Item = &Reading> {
        self.readings.iter().filter(move |r| r.mode == mode)
    }

    /// Write the CSV schema, header included.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = ReadingWriter::new(writer)?;
        writer.write_all(&self.readings)?;
        writer.into_inner()?;
        Ok(())
    }

    /// Export to CSV file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))
    }

    /// Read the CSV schema. Any malformed line fails the whole read.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut ingestor = Ingestor::from_reader(BufReader::new(reader), IngestConfig::default())?;
        let readings: Vec<Reading> = ingestor.by_ref().collect();

        if let Some((line, reason)) = ingestor.last_rejection() {
            return Err(DatasetError::CsvParse {
                line: *line,
                message: reason.to_string(),
            });
        }
        Ok(Self::from_readings(readings))
    }

    /// Import from CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        Self::read_csv(File::open(path)?)
    }

    /// Export to JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Import from JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let dataset = serde_json::from_reader(reader)?;
        Ok(dataset)
    }

    /// Per-mode counts and null statistics.
    pub fn summary(&self) -> DatasetSummary {
        let mut summary = DatasetSummary {
            total: self.readings.len(),
            ..Default::default()
        };
        for reading in &self.readings {
            match reading.mode {
                Mode::Normal => summary.normal += 1,
                Mode::Alert => summary.alert += 1,
                Mode::Failure => summary.failure += 1,
            }
            summary.null_fields += reading.null_count();
        }
        if let (Some(first), Some(last)) = (self.readings.first(), self.readings.last()) {
            summary.span_secs = last.timestamp.saturating_sub(first.timestamp);
        }
        summary
    }
}

/// Dataset overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub normal: usize,
    pub alert: usize,
    pub failure: usize,
    /// Null numeric fields across all readings.
    pub null_fields: usize,
    pub span_secs: u64,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} readings over {}s (normal {}, alert {}, failure {}), {} null fields",
            self.total, self.span_secs, self.normal, self.alert, self.failure, self.null_fields
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::from_readings(vec![
            Reading::empty(10, Mode::Normal)
                .with_temperature(25.5)
                .with_pressure(5.0)
                .with_vibration(0.1, 0.2, 0.3)
                .with_level(101.0),
            Reading::empty(11, Mode::Failure).with_pressure(12.5),
        ])
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.normal, 1);
        assert_eq!(summary.failure, 1);
        assert_eq!(summary.null_fields, 6);
        assert_eq!(summary.span_secs, 1);
        assert!(summary.to_string().starts_with("2 readings over 1s"));
    }

    #[test]
    fn test_csv_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let dataset = sample();
        dataset.to_csv(&path).unwrap();

        let loaded = Dataset::from_csv(&path).unwrap();
        assert_eq!(loaded.readings, dataset.readings);
    }

    #[test]
    fn test_corrupt_csv_is_rejected() {
        let text = format!("{}\n10,0,abc,5,1,1,1,1.7,100,NORMAL\n", plantwatch::HEADER);
        let err = Dataset::read_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::CsvParse { line: 2, .. }));
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut dataset = sample();
        dataset.metadata.seed = Some(7);
        dataset.to_json(&path).unwrap();

        let loaded = Dataset::from_json(&path).unwrap();
        assert_eq!(loaded, dataset);
    }
}
