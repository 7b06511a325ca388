// Plantwatch Monitor - Integration Tests
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

use plantwatch::{Mode, Reading, StreamMessage};
use plantwatch_anomaly::DetectionMethod;
use plantwatch_monitor::{
    shutdown_channel, ConnectionState, LiveScoringConfig, MemoryTransport, MonitorConfig, MonitorSession,
    Publisher, PublisherConfig, ScriptStep, Severity, SharedSession, StreamConsumer, TcpTransport,
};
use plantwatch_testdata::{GeneratorConfig, ModeSelector, ScenarioGenerator, ScenarioProfile};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

fn nominal(timestamp: u64) -> Reading {
    Reading::empty(timestamp, Mode::Normal)
        .with_temperature(25.0)
        .with_pressure(5.0)
        .with_vibration(0.3, 0.0, 0.0)
        .with_level(100.0)
}

fn line(reading: &Reading) -> String {
    StreamMessage::from_reading(reading, false).to_json().unwrap()
}

fn lines(range: std::ops::Range<u64>) -> Vec<String> {
    range.map(|ts| line(&nominal(ts))).collect()
}

/// Poll the session until `done` holds.
async fn wait_until(session: &SharedSession, done: impl Fn(&MonitorSession) -> bool) {
    loop {
        if done(&*session.read().await) {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

// ============================================================================
// Session behavior
// ============================================================================

#[test]
fn test_01_window_keeps_latest_readings_in_order() {
    for capacity in [5_u64, 20] {
        let config = MonitorConfig::default().with_window_capacity(capacity as usize);
        let mut session = MonitorSession::new(config).unwrap();
        for text in lines(0..capacity + 5) {
            session.handle_line(&text);
        }

        let timestamps: Vec<u64> = session.window().iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, (5..capacity + 5).collect::<Vec<_>>());
        assert_eq!(session.stats().received, capacity + 5);
        assert!(session.alerts().is_empty());
    }
}

#[test]
fn test_02_hard_limit_raises_single_critical() {
    let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
    let alerts = session.handle_line(&line(&nominal(1).with_temperature(45.0)));

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert_eq!(alerts[0].sensor, "temperature");
    assert!(alerts.iter().all(|a| a.severity != Severity::Warning));
}

#[test]
fn test_03_warning_band_raises_warning() {
    let mut session = MonitorSession::new(MonitorConfig::default()).unwrap();
    let alerts = session.handle_line(&line(&nominal(1).with_pressure(7.0)));

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Warning);
    assert_eq!(alerts[0].sensor, "pressure");
}

#[test]
fn test_04_alert_history_is_bounded() {
    let config = MonitorConfig::default().with_alert_history(3);
    let mut session = MonitorSession::new(config).unwrap();
    for ts in 0..8 {
        session.handle_line(&line(&nominal(ts).with_temperature(45.0)));
    }

    assert_eq!(session.alerts().len(), 3);
    assert_eq!(session.alerts().total_raised(), 8);
    let kept: Vec<u64> = session.alerts().iter().map(|a| a.timestamp).collect();
    assert_eq!(kept, vec![5, 6, 7]);
}

#[test]
fn test_05_live_scoring_flags_spike_in_stream() {
    let config = MonitorConfig::default()
        .with_window_capacity(40)
        .with_live_scoring(LiveScoringConfig::new(DetectionMethod::Iqr));
    let mut session = MonitorSession::new(config).unwrap();

    for ts in 0..39 {
        let temperature = 24.0 + (ts % 5) as f64 * 0.5;
        let alerts = session.handle_line(&line(&nominal(ts).with_temperature(temperature)));
        assert!(alerts.iter().all(|a| a.sensor != "anomaly"));
    }

    // Inside every threshold band, far outside the recent distribution.
    let alerts = session.handle_line(&line(&nominal(39).with_temperature(29.5)));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].sensor, "anomaly");
    assert_eq!(alerts[0].severity, Severity::Warning);
}

#[test]
fn test_05b_live_scoring_flags_step_over_constant_window() {
    let config = MonitorConfig::default()
        .with_window_capacity(40)
        .with_live_scoring(LiveScoringConfig::new(DetectionMethod::Iqr));
    let mut session = MonitorSession::new(config).unwrap();

    for text in lines(0..39) {
        assert!(session.handle_line(&text).is_empty());
    }

    // Every feature has zero spread, so the step is scored on raw excess.
    let alerts = session.handle_line(&line(&nominal(39).with_pressure(5.5)));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].sensor, "anomaly");
    assert_eq!(alerts[0].severity, Severity::Warning);
    assert_eq!(session.alerts().len(), 1);
}

// ============================================================================
// Reconnect state machine
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_06_reconnects_after_refusals() {
    let session = MonitorSession::new(MonitorConfig::default().with_reconnect_backoff_secs(5))
        .unwrap()
        .shared();
    let transport = MemoryTransport::new([ScriptStep::Refuse, ScriptStep::Refuse, ScriptStep::Hold(lines(0..3))]);
    let (handle, signal) = shutdown_channel();

    let started = Instant::now();
    let consumer = StreamConsumer::new(transport, session.clone(), signal).await;
    let task = tokio::spawn(consumer.run());

    wait_until(&session, |s| s.stats().received == 3).await;
    assert!(started.elapsed() >= Duration::from_secs(10));
    {
        let s = session.read().await;
        assert_eq!(s.state(), ConnectionState::Connected);
        assert_eq!(s.stats().connect_attempts, 3);
        assert_eq!(s.stats().connections, 1);
        // One alert for the whole refusal streak.
        assert_eq!(s.alerts().iter().filter(|a| a.sensor == "transport").count(), 1);
    }

    handle.shutdown();
    let transport = task.await.unwrap();
    assert_eq!(transport.attempts(), 3);
    assert_eq!(session.read().await.state(), ConnectionState::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_07_lost_connection_is_reported_and_retried() {
    let session = MonitorSession::new(MonitorConfig::default().with_reconnect_backoff_secs(2))
        .unwrap()
        .shared();
    let transport = MemoryTransport::new([ScriptStep::Deliver(lines(0..2)), ScriptStep::Hold(lines(2..4))]);
    let (handle, signal) = shutdown_channel();
    let task = tokio::spawn(StreamConsumer::new(transport, session.clone(), signal).await.run());

    wait_until(&session, |s| s.stats().received == 4).await;
    {
        let s = session.read().await;
        assert_eq!(s.stats().connections, 2);
        assert_eq!(s.stats().disconnects, 1);
        let lost: Vec<_> = s.alerts().iter().filter(|a| a.message.starts_with("connection lost")).collect();
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].severity, Severity::Warning);
        let timestamps: Vec<u64> = s.window().iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![0, 1, 2, 3]);
    }

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_08_shutdown_interrupts_backoff() {
    let session = MonitorSession::new(MonitorConfig::default().with_reconnect_backoff_secs(3600))
        .unwrap()
        .shared();
    let (handle, signal) = shutdown_channel();
    let task = tokio::spawn(
        StreamConsumer::new(MemoryTransport::new([ScriptStep::Refuse]), session.clone(), signal)
            .await
            .run(),
    );

    wait_until(&session, |s| s.state() == ConnectionState::Backoff).await;
    let started = Instant::now();
    handle.shutdown();
    let transport = task.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.attempts(), 1);
    assert_eq!(session.read().await.state(), ConnectionState::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_09_malformed_stream_lines_are_skipped() {
    let session = MonitorSession::new(MonitorConfig::default()).unwrap().shared();
    let script = vec![
        line(&nominal(0)),
        "not json".to_string(),
        "{\"temperature\": 20.0}".to_string(),
        line(&nominal(1)),
    ];
    let (handle, signal) = shutdown_channel();
    let task = tokio::spawn(
        StreamConsumer::new(MemoryTransport::new([ScriptStep::Hold(script)]), session.clone(), signal)
            .await
            .run(),
    );

    wait_until(&session, |s| s.stats().received + s.stats().discarded == 4).await;
    {
        let s = session.read().await;
        assert_eq!(s.stats().received, 2);
        assert_eq!(s.stats().discarded, 2);
        assert_eq!(s.state(), ConnectionState::Connected);
    }

    handle.shutdown();
    task.await.unwrap();
}

// ============================================================================
// End to end over TCP
// ============================================================================

#[tokio::test]
async fn test_10_publisher_to_consumer() {
    let generator = ScenarioGenerator::new(
        ModeSelector::Single(Mode::Normal),
        GeneratorConfig::new().with_count(20).with_seed(7).with_start_time(1_000),
        ScenarioProfile::default(),
    )
    .unwrap();

    let config = PublisherConfig::new()
        .with_interval(Duration::from_millis(5))
        .with_network_failure_rate(0.5)
        .with_seed(3)
        .with_wait_for_subscriber(true);
    let publisher = Publisher::bind("127.0.0.1:0", config).await.unwrap();
    let addr = publisher.local_addr().unwrap();
    let (_publisher_handle, publisher_signal) = shutdown_channel();
    let publishing = tokio::spawn(publisher.run(generator, publisher_signal));

    let config = MonitorConfig::default().with_window_capacity(50).with_alert_history(200);
    let session = MonitorSession::new(config).unwrap().shared();
    let (handle, signal) = shutdown_channel();
    let consumer = StreamConsumer::new(TcpTransport::new(addr.to_string()), session.clone(), signal)
        .await
        .with_backoff(Duration::from_millis(50));
    let consuming = tokio::spawn(consumer.run());

    let stats = timeout(Duration::from_secs(10), publishing).await.unwrap().unwrap().unwrap();
    assert_eq!(stats.published, 20);
    assert_eq!(stats.unheard, 0);
    assert!(stats.subscribers >= 1);

    timeout(Duration::from_secs(10), wait_until(&session, |s| s.stats().received == 20))
        .await
        .unwrap();
    {
        let s = session.read().await;
        let timestamps: Vec<u64> = s.window().iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, (0..20).map(|i| 1_000 + i).collect::<Vec<_>>());
        let network = s
            .alerts()
            .iter()
            .filter(|a| a.message == "device reported network failure")
            .count() as u64;
        assert_eq!(network, stats.network_failures);
    }

    handle.shutdown();
    timeout(Duration::from_secs(5), consuming).await.unwrap().unwrap();
}

// ============================================================================
// Configuration file
// ============================================================================

#[test]
fn test_11_config_file_drives_thresholds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor.json");
    std::fs::write(
        &path,
        r#"{
            "window_capacity": 8,
            "thresholds": {
                "temperature": {"min": 0.0, "warning_min": 5.0, "warning_max": 22.0, "max": 26.0}
            }
        }"#,
    )
    .unwrap();

    let config = MonitorConfig::from_json_file(&path).unwrap();
    assert_eq!(config.window_capacity, 8);

    let mut session = MonitorSession::new(config).unwrap();
    let alerts = session.handle_line(&line(&nominal(1)));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Warning);
    assert_eq!(alerts[0].sensor, "temperature");

    // Sensors without a band are not checked.
    let alerts = session.handle_line(&line(&nominal(2).with_temperature(20.0).with_level(500.0)));
    assert!(alerts.is_empty());
}

#[test]
fn test_12_invalid_band_in_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("monitor.json");
    std::fs::write(
        &path,
        r#"{"thresholds": {"pressure": {"min": 8.0, "warning_min": 4.0, "warning_max": 6.0, "max": 3.0}}}"#,
    )
    .unwrap();

    assert!(matches!(
        MonitorConfig::from_json_file(&path),
        Err(plantwatch_monitor::MonitorError::InvalidBand { .. })
    ));
}
