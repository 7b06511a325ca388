// Plantwatch Monitor - HTTP visualization feed
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP feed for dashboards and Prometheus.

use crate::alert::AlertEvent;
use crate::session::{SessionStatus, SharedSession};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use plantwatch::Reading;
use std::fmt::Write;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Routes over one session.
pub fn router(session: SharedSession) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .route("/window", get(window_handler))
        .route("/alerts", get(alerts_handler))
        .with_state(session)
}

/// Serve the feed until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, session: SharedSession, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP feed on http://{}", addr);
        info!("Metrics endpoint: http://{}/metrics", addr);
    }
    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Alerts listed on the root page, newest first.
const ROOT_ALERTS: usize = 5;

/// Plain-text status of the session.
async fn root_handler(State(session): State<SharedSession>) -> String {
    let session = session.read().await;
    let status = session.status();

    let mut page = format!(
        "plantwatch monitor {}\nstate: {}\nuptime: {}s\nwindow: {}/{}\nreadings: {} received, {} discarded\n",
        status.version,
        status.state,
        status.uptime_secs,
        status.window_len,
        status.window_capacity,
        status.stats.received,
        status.stats.discarded,
    );
    if let Some(method) = status.live_scoring {
        let _ = writeln!(page, "live scoring: {}", method);
    }
    let _ = writeln!(page, "alerts: {} raised, {} retained", status.alerts_raised, status.alerts_retained);
    for alert in session.alerts().iter().rev().take(ROOT_ALERTS) {
        let _ = writeln!(page, "  {}", alert);
    }
    page.push_str("feeds: /status /window /alerts /metrics /health\n");
    page
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(session): State<SharedSession>) -> impl IntoResponse {
    match session.read().await.metrics().encode() {
        Ok(text) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            text,
        ),
        Err(e) => {
            error!(error = %e, "metrics encoding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}

async fn status_handler(State(session): State<SharedSession>) -> Json<SessionStatus> {
    Json(session.read().await.status())
}

/// Window readings, oldest first.
async fn window_handler(State(session): State<SharedSession>) -> Json<Vec<Reading>> {
    Json(session.read().await.window().to_vec())
}

/// Retained alerts, oldest first.
async fn alerts_handler(State(session): State<SharedSession>) -> Json<Vec<AlertEvent>> {
    Json(session.read().await.alerts().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::session::MonitorSession;
    use plantwatch::Mode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_feed_endpoints() {
        let session = MonitorSession::new(MonitorConfig::default()).unwrap().shared();
        session.write().await.handle(plantwatch::LiveReading {
            reading: Reading::empty(11, Mode::Normal).with_temperature(45.0),
            sensor_failure: false,
            network_failure: false,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, session.clone(), async {
            let _ = stopped.await;
        }));

        let health = get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.ends_with("OK"));

        let window = get(addr, "/window").await;
        assert!(window.contains("\"timestamp\":11"));

        let alerts = get(addr, "/alerts").await;
        assert!(alerts.contains("\"severity\":\"CRITICAL\""));

        let metrics = get(addr, "/metrics").await;
        assert!(metrics.contains("plantwatch_readings_received_total 1"));

        let status = get(addr, "/status").await;
        assert!(status.contains("\"state\":\"CONNECTING\""));

        let root = get(addr, "/").await;
        assert!(root.starts_with("HTTP/1.1 200"));
        assert!(root.contains("state: CONNECTING"));
        assert!(root.contains("window: 1/20"));
        assert!(root.contains("alerts: 2 raised, 2 retained"));
        assert!(root.contains("[CRITICAL] 11 temperature:"));
        assert!(!root.contains("<html"));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
