//! Integration tests for the reading schema and the ingestor.

use plantwatch::*;
use std::fs::File;
use std::io::{BufReader, Write};

// ============================================================================
// Helper Functions
// ============================================================================

fn good_line(ts: u64) -> String {
    format!("{},0,25.0,5.0,0.3,0.0,0.4,0.5,100.0,NORMAL", ts)
}

fn sample_readings() -> Vec<Reading> {
    vec![
        Reading::empty(1000, Mode::Normal)
            .with_temperature(24.913_457_2)
            .with_pressure(5.000_000_1)
            .with_vibration(0.123_456_789, -0.2, 0.333_333_333_333_333_3)
            .with_level(99.1),
        Reading::empty(1002, Mode::Alert)
            .with_temperature(35.5)
            .with_pressure(7.25)
            .with_vibration(1.0e-7, 0.9, -0.4)
            .with_level(150.0),
        Reading {
            vibration_mag: None,
            ..Reading::empty(1004, Mode::Failure)
                .with_temperature(-9.75)
                .with_level(281.062_5)
        },
    ]
}

// ============================================================================
// Section 1: Robustness
// ============================================================================

#[test]
fn test_01_each_bad_line_discarded_once() {
    let cases = [
        "101,0,25.0,5.0,0.3,0.0,0.4,0.5,100.0",
        "102,0,warm,5.0,0.3,0.0,0.4,0.5,100.0,NORMAL",
        "103,STANDBY,25.0,5.0,0.3,0.0,0.4,0.5,100.0,NORMAL",
    ];

    for bad in cases {
        let lines = vec![good_line(100), bad.to_string(), good_line(104)];
        let mut ingestor = Ingestor::new(lines, IngestConfig::default()).unwrap();
        let timestamps: Vec<u64> = ingestor.by_ref().map(|r| r.timestamp).collect();

        assert_eq!(timestamps, vec![100, 104], "case {}", bad);
        let stats = ingestor.stats();
        assert_eq!(stats.discarded, 1, "case {}", bad);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.seen, 3);
    }
}

#[test]
fn test_02_noisy_live_stream_keeps_going() {
    let mut lines = Vec::new();
    for i in 0..200u64 {
        if i % 7 == 0 {
            lines.push(format!("{},0,25.0,\u{fffd}garbage", i));
        } else {
            lines.push(good_line(i));
        }
    }

    let mut ingestor = Ingestor::new(lines.iter(), IngestConfig::default()).unwrap();
    let count = ingestor.by_ref().count();

    let bad = (0..200u64).filter(|i| i % 7 == 0).count() as u64;
    assert_eq!(count as u64, 200 - bad);
    assert_eq!(ingestor.stats().discarded, bad);
    assert!(ingestor.last_rejection().is_some());
}

#[test]
fn test_03_stats_on_demand_for_unbounded_source() {
    let endless = (0u64..).map(good_line);
    let mut ingestor = Ingestor::new(endless, IngestConfig::default()).unwrap();

    let first: Vec<Reading> = ingestor.by_ref().take(50).collect();
    assert_eq!(first.len(), 50);
    assert_eq!(ingestor.stats().accepted, 50);
    assert_eq!(ingestor.stats().discarded, 0);
}

#[test]
fn test_04_failure_rows_accept_nulls() {
    let lines = [
        "5,2,NULL,NULL,NULL,NULL,NULL,NULL,NULL,FAILURE",
        "6,FAILURE,80.5,NULL,2.0,1.0,2.0,3.0,NULL,FAILURE",
    ];
    let readings: Vec<Reading> = Ingestor::new(lines, IngestConfig::default())
        .unwrap()
        .collect();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].null_count(), 7);
    assert_eq!(readings[1].temperature, Some(80.5));
    assert_eq!(readings[1].vibration_mag, Some(3.0));
}

// ============================================================================
// Section 2: CSV Round-trip
// ============================================================================

#[test]
fn test_05_csv_roundtrip_is_exact() {
    let originals = sample_readings();

    let mut writer = ReadingWriter::new(Vec::new()).unwrap();
    writer.write_all(&originals).unwrap();
    let bytes = writer.into_inner().unwrap();

    let mut ingestor =
        Ingestor::from_reader(bytes.as_slice(), IngestConfig::default()).unwrap();
    let parsed: Vec<Reading> = ingestor.by_ref().collect();

    assert_eq!(parsed, originals);
    assert_eq!(ingestor.stats().skipped, 1);
    assert_eq!(ingestor.stats().discarded, 0);
}

#[test]
fn test_06_csv_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readings.csv");

    {
        let file = File::create(&path).unwrap();
        let mut writer = ReadingWriter::new(file).unwrap();
        writer.write_all(&sample_readings()).unwrap();
        let mut file = writer.into_inner().unwrap();
        file.flush().unwrap();
    }

    let reader = BufReader::new(File::open(&path).unwrap());
    let parsed: Vec<Reading> = Ingestor::from_reader(reader, IngestConfig::default())
        .unwrap()
        .collect();
    assert_eq!(parsed, sample_readings());
}

#[test]
fn test_07_serial_preamble_is_skipped() {
    let text = format!(
        "# Sensor data collected from /dev/ttyUSB0\n# Started at 2024-02-01T00:00:00Z\n{}\n{}\n",
        HEADER,
        good_line(1)
    );
    let mut ingestor = Ingestor::from_reader(text.as_bytes(), IngestConfig::default()).unwrap();
    assert_eq!(ingestor.by_ref().count(), 1);
    assert_eq!(ingestor.stats().skipped, 3);
}

// ============================================================================
// Section 3: Streaming messages
// ============================================================================

#[test]
fn test_08_stream_message_matches_csv_reading() {
    let reading = sample_readings().remove(1);
    let json = StreamMessage::from_reading(&reading, false).to_json().unwrap();
    let live = parse_live_reading(&json).unwrap();

    assert_eq!(live.reading, reading);
    approx::assert_relative_eq!(
        live.reading.vibration_mag.unwrap(),
        live.reading.vibration_norm().unwrap()
    );
}
