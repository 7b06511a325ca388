//! Flat-file CSV interchange schema.
//!
//! ```text
//! timestamp,mode,temperature,pressure,vibration_x,vibration_y,vibration_z,vibration_mag,level,status
//! 1706745600,0,24.7,5.1,0.21,-0.33,0.12,0.41,101.2,NORMAL
//! ```
//!
//! `mode` is written as its integer code, `status` as the matching label and
//! null fields as the literal `NULL`. Floats use the shortest representation
//! that parses back to the same value.

use crate::reading::Reading;
use std::io::{self, Write};

/// Null sentinel token.
pub const NULL_TOKEN: &str = "NULL";

/// Field delimiter.
pub const DELIMITER: char = ',';

/// Header row of the CSV schema.
pub const HEADER: &str =
    "timestamp,mode,temperature,pressure,vibration_x,vibration_y,vibration_z,vibration_mag,level,status";

/// A column of the line schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    Mode,
    Temperature,
    Pressure,
    VibrationX,
    VibrationY,
    VibrationZ,
    VibrationMag,
    Level,
    Status,
}

impl Column {
    /// Standard column order.
    pub const STANDARD: [Column; 10] = [
        Column::Timestamp,
        Column::Mode,
        Column::Temperature,
        Column::Pressure,
        Column::VibrationX,
        Column::VibrationY,
        Column::VibrationZ,
        Column::VibrationMag,
        Column::Level,
        Column::Status,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::Mode => "mode",
            Column::Temperature => "temperature",
            Column::Pressure => "pressure",
            Column::VibrationX => "vibration_x",
            Column::VibrationY => "vibration_y",
            Column::VibrationZ => "vibration_z",
            Column::VibrationMag => "vibration_mag",
            Column::Level => "level",
            Column::Status => "status",
        }
    }

    /// Whether the column carries a nullable float.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Column::Timestamp | Column::Mode | Column::Status)
    }
}

/// Header line for an arbitrary column layout.
pub fn header_for(columns: &[Column], delimiter: char) -> String {
    let names: Vec<&str> = columns.iter().map(Column::name).collect();
    names.join(&delimiter.to_string())
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NULL_TOKEN.to_string(),
    }
}

/// Render one reading as a CSV line (without trailing newline).
pub fn format_line(reading: &Reading) -> String {
    let mut fields = Vec::with_capacity(Column::STANDARD.len());
    fields.push(reading.timestamp.to_string());
    fields.push(reading.mode.code().to_string());
    for value in reading.numeric_fields() {
        fields.push(format_value(value));
    }
    fields.push(reading.status().to_string());
    fields.join(",")
}

/// Streaming CSV writer for readings.
pub struct ReadingWriter<W: Write> {
    inner: W,
    rows_written: usize,
}

impl<W: Write> ReadingWriter<W> {
    /// Wrap a writer and emit the header row.
    pub fn new(mut inner: W) -> io::Result<Self> {
        writeln!(inner, "{}", HEADER)?;
        Ok(Self {
            inner,
            rows_written: 0,
        })
    }

    pub fn write(&mut self, reading: &Reading) -> io::Result<()> {
        writeln!(self.inner, "{}", format_line(reading))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_all<'a>(&mut self, readings: impl IntoIterator<Item = &'a Reading>) -> io::Result<()> {
        for reading in readings {
            self.write(reading)?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
