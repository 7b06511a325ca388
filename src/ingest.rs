//! Line-oriented ingestion of raw sensor records.
//!
//! The [`Ingestor`] wraps any sequence of text lines (a file, a serial port
//! reader, stdin) and lazily yields validated [`Reading`]s. Malformed lines
//! never stop the stream: each one is logged at warning level, counted as
//! discarded and skipped.
//!
//! ```rust
//! use plantwatch::{IngestConfig, Ingestor};
//!
//! let raw = [
//!     "timestamp,mode,temperature,pressure,vibration_x,vibration_y,vibration_z,vibration_mag,level,status",
//!     "10,0,25.1,5.0,0.1,0.2,0.2,0.3,100.0,NORMAL",
//!     "11,0,25.3,5.0,0.1,0.2",
//!     "12,2,NULL,NULL,NULL,NULL,NULL,NULL,NULL,FAILURE",
//! ];
//!
//! let mut ingestor = Ingestor::new(raw, IngestConfig::default()).unwrap();
//! let readings: Vec<_> = ingestor.by_ref().collect();
//!
//! assert_eq!(readings.len(), 2);
//! assert_eq!(ingestor.stats().discarded, 1);
//! ```

use crate::error::{IngestError, Result, ValidationError};
use crate::reading::{magnitude, Mode, Reading};
use crate::schema::{header_for, Column, DELIMITER, NULL_TOKEN};
use log::{debug, warn};
use std::io::{self, BufRead};

/// Ingestor configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Field delimiter.
    pub delimiter: char,
    /// Literal that stands for a null field.
    pub null_token: String,
    /// Expected column order.
    pub columns: Vec<Column>,
    /// Skip lines starting with `#`.
    pub skip_comments: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: DELIMITER,
            null_token: NULL_TOKEN.to_string(),
            columns: Column::STANDARD.to_vec(),
            skip_comments: true,
        }
    }
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_null_token(mut self, token: &str) -> Self {
        self.null_token = token.to_string();
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_skip_comments(mut self, skip: bool) -> Self {
        self.skip_comments = skip;
        self
    }

    fn validate(&self) -> Result<()> {
        for required in [Column::Timestamp, Column::Mode] {
            if !self.columns.contains(&required) {
                return Err(IngestError::MissingColumn(required.name()));
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].contains(column) {
                return Err(IngestError::DuplicateColumn(column.name()));
            }
        }
        if self.null_token.is_empty() || self.null_token.contains(self.delimiter) {
            return Err(IngestError::InvalidNullToken(self.null_token.clone()));
        }
        Ok(())
    }
}

/// Running line counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Every line pulled from the source.
    pub seen: u64,
    /// Lines turned into readings.
    pub accepted: u64,
    /// Malformed lines dropped.
    pub discarded: u64,
    /// Header, comment and blank lines.
    pub skipped: u64,
}

impl IngestStats {
    /// Fraction of data lines that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        let data_lines = self.accepted + self.discarded;
        if data_lines == 0 {
            return 1.0;
        }
        self.accepted as f64 / data_lines as f64
    }
}

/// Parses single lines against a validated column layout.
#[derive(Debug, Clone)]
pub struct LineParser {
    config: IngestConfig,
    header: String,
}

impl LineParser {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        let header = header_for(&config.columns, config.delimiter);
        Ok(Self { config, header })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Whether the line is the layout's header row.
    pub fn is_header(&self, line: &str) -> bool {
        line.trim() == self.header
    }

    /// Parse one data line.
    pub fn parse(&self, line: &str) -> std::result::Result<Reading, ValidationError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(self.config.delimiter).collect();
        if fields.len() != self.config.columns.len() {
            return Err(ValidationError::FieldCount {
                expected: self.config.columns.len(),
                found: fields.len(),
            });
        }

        let mut timestamp = None;
        let mut mode = None;
        let mut status = None;
        let mut reading = Reading::empty(0, Mode::Normal);

        for (column, raw) in self.config.columns.iter().zip(fields) {
            let field = raw.trim();
            let is_null = field == self.config.null_token;
            match column {
                Column::Timestamp => {
                    if is_null {
                        return Err(ValidationError::NullNotAllowed(column.name()));
                    }
                    let ts = field
                        .parse::<u64>()
                        .map_err(|_| ValidationError::InvalidTimestamp(field.to_string()))?;
                    timestamp = Some(ts);
                }
                Column::Mode => {
                    if is_null {
                        return Err(ValidationError::NullNotAllowed(column.name()));
                    }
                    let parsed = field
                        .parse::<Mode>()
                        .map_err(|_| ValidationError::UnknownMode(field.to_string()))?;
                    mode = Some(parsed);
                }
                Column::Status => {
                    if !is_null {
                        status = Some(field);
                    }
                }
                numeric => {
                    let value = if is_null {
                        None
                    } else {
                        Some(parse_number(numeric.name(), field)?)
                    };
                    assign(&mut reading, *numeric, value);
                }
            }
        }

        // Layout validation guarantees both columns exist.
        let (Some(timestamp), Some(mode)) = (timestamp, mode) else {
            return Err(ValidationError::NullNotAllowed(Column::Timestamp.name()));
        };
        reading.timestamp = timestamp;
        reading.mode = mode;

        if let Some(status) = status {
            if !status.eq_ignore_ascii_case(mode.label()) {
                return Err(ValidationError::StatusMismatch {
                    status: status.to_string(),
                    mode: mode.label().to_string(),
                });
            }
        }

        if !self.config.columns.contains(&Column::VibrationMag) {
            reading.vibration_mag = match (reading.vibration_x, reading.vibration_y, reading.vibration_z) {
                (Some(x), Some(y), Some(z)) => Some(magnitude(x, y, z)),
                _ => None,
            };
        }

        Ok(reading)
    }
}

fn parse_number(column: &'static str, field: &str) -> std::result::Result<f64, ValidationError> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::InvalidNumber {
            column,
            value: field.to_string(),
        }),
    }
}

fn assign(reading: &mut Reading, column: Column, value: Option<f64>) {
    match column {
        Column::Temperature => reading.temperature = value,
        Column::Pressure => reading.pressure = value,
        Column::VibrationX => reading.vibration_x = value,
        Column::VibrationY => reading.vibration_y = value,
        Column::VibrationZ => reading.vibration_z = value,
        Column::VibrationMag => reading.vibration_mag = value,
        Column::Level => reading.level = value,
        Column::Timestamp | Column::Mode | Column::Status => {}
    }
}

/// Lazy validating adapter over a sequence of raw lines.
pub struct Ingestor<I> {
    lines: I,
    parser: LineParser,
    stats: IngestStats,
    last_rejection: Option<(u64, ValidationError)>,
}

impl<I, S> Ingestor<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    /// Wrap a line source. Fails only on an invalid layout.
    pub fn new<T>(lines: T, config: IngestConfig) -> Result<Self>
    where
        T: IntoIterator<IntoIter = I>,
    {
        Ok(Self {
            lines: lines.into_iter(),
            parser: LineParser::new(config)?,
            stats: IngestStats::default(),
            last_rejection: None,
        })
    }

    /// Counters so far. Safe to call mid-stream.
    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Most recent discarded line number and reason.
    pub fn last_rejection(&self) -> Option<&(u64, ValidationError)> {
        self.last_rejection.as_ref()
    }

    fn should_skip(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty()
            || (self.parser.config().skip_comments && trimmed.starts_with('#'))
            || self.parser.is_header(trimmed)
    }
}

impl<R: BufRead> Ingestor<ReaderLines<R>> {
    /// Ingest from a buffered reader. A read error ends the stream.
    pub fn from_reader(reader: R, config: IngestConfig) -> Result<Self> {
        Self::new(ReaderLines::new(reader), config)
    }
}

impl<I, S> Iterator for Ingestor<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        loop {
            let line = self.lines.next()?;
            let line = line.as_ref();
            self.stats.seen += 1;

            if self.should_skip(line) {
                self.stats.skipped += 1;
                continue;
            }

            match self.parser.parse(line) {
                Ok(reading) => {
                    self.stats.accepted += 1;
                    if self.stats.accepted % 1000 == 0 {
                        debug!("ingested {} readings", self.stats.accepted);
                    }
                    return Some(reading);
                }
                Err(e) => {
                    self.stats.discarded += 1;
                    warn!("discarding line {}: {}", self.stats.seen, e);
                    self.last_rejection = Some((self.stats.seen, e));
                }
            }
        }
    }
}

/// Lines of a buffered reader, ending at the first IO error.
pub struct ReaderLines<R> {
    lines: io::Lines<R>,
    done: bool,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for ReaderLines<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        match self.lines.next()? {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("line source failed: {}", e);
                self.done = true;
                None
            }
        }
    }
}
