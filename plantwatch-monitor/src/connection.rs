// Plantwatch Monitor - Reconnecting consumer loop
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! StreamConsumer - the reconnect state machine.
//!
//! ```text
//!            connect ok              peer gone / read error
//! CONNECTING ----------> CONNECTED -------------------------> BACKOFF
//!     ^   \                                                     |
//!     |    `------------------ connect failed ----------------->|
//!     `-------------------------- backoff elapsed --------------'
//!
//! any state --- shutdown signal ---> SHUTDOWN
//! ```
//!
//! Retries are unlimited and use a fixed delay. Messages missed while
//! disconnected are not replayed. The shutdown signal is checked while
//! waiting, never in the middle of handling a message.

use crate::error::TransportError;
use crate::session::SharedSession;
use crate::transport::{Subscription, Transport};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

/// Connection status of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Backoff,
    Shutdown,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Backoff => "BACKOFF",
            ConnectionState::Shutdown => "SHUTDOWN",
        }
    }

    /// Gauge value.
    pub fn code(&self) -> i64 {
        match self {
            ConnectionState::Connecting => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Backoff => 2,
            ConnectionState::Shutdown => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle that stops a running consumer.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        // No receivers left means the consumer already stopped.
        let _ = self.sender.send(true);
    }
}

/// Create a shutdown handle and the matching signal for a consumer.
pub fn shutdown_channel() -> (ShutdownHandle, watch::Receiver<bool>) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownHandle { sender }, receiver)
}

/// Completes once shutdown is requested or every handle is dropped.
pub async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    while !*signal.borrow_and_update() {
        if signal.changed().await.is_err() {
            return;
        }
    }
}

/// Single logical consumer of one transport into one session.
pub struct StreamConsumer<T: Transport> {
    transport: T,
    session: SharedSession,
    backoff: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport> StreamConsumer<T> {
    /// The backoff delay comes from the session's configuration.
    pub async fn new(transport: T, session: SharedSession, shutdown: watch::Receiver<bool>) -> Self {
        let backoff = session.read().await.config().reconnect_backoff();
        Self {
            transport,
            session,
            backoff,
            shutdown,
        }
    }

    /// Override the backoff delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until shutdown. Returns the transport for inspection.
    pub async fn run(mut self) -> T {
        info!(endpoint = %self.transport.endpoint(), "consumer starting");
        let mut subscription: Option<Box<dyn Subscription>> = None;
        let mut state = ConnectionState::Connecting;

        loop {
            state = match state {
                ConnectionState::Connecting => {
                    self.session.write().await.connect_attempt();
                    let attempt = tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut self.shutdown) => None,
                        result = self.transport.connect() => Some(result),
                    };
                    match attempt {
                        None => ConnectionState::Shutdown,
                        Some(Ok(sub)) => {
                            info!(endpoint = %self.transport.endpoint(), "connected");
                            subscription = Some(sub);
                            self.session.write().await.connected();
                            ConnectionState::Connected
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, backoff = ?self.backoff, "connect failed");
                            self.session.write().await.connect_failed(&e.to_string());
                            ConnectionState::Backoff
                        }
                    }
                }

                ConnectionState::Connected => {
                    let Some(sub) = subscription.as_mut() else {
                        state = ConnectionState::Connecting;
                        continue;
                    };
                    let next = tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut self.shutdown) => None,
                        line = sub.next_line() => Some(line),
                    };
                    match next {
                        None => ConnectionState::Shutdown,
                        Some(Ok(line)) => {
                            self.session.write().await.handle_line(&line);
                            ConnectionState::Connected
                        }
                        Some(Err(e)) => {
                            subscription = None;
                            self.lost(e).await;
                            ConnectionState::Backoff
                        }
                    }
                }

                ConnectionState::Backoff => {
                    self.session.write().await.set_state(ConnectionState::Backoff);
                    let shutdown = tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut self.shutdown) => true,
                        _ = sleep(self.backoff) => false,
                    };
                    if shutdown {
                        ConnectionState::Shutdown
                    } else {
                        ConnectionState::Connecting
                    }
                }

                ConnectionState::Shutdown => break,
            };
        }

        self.session.write().await.set_state(ConnectionState::Shutdown);
        info!("consumer stopped");
        self.transport
    }

    async fn lost(&self, error: TransportError) {
        warn!(error = %error, backoff = ?self.backoff, "stream lost");
        self.session.write().await.connection_lost(&error.to_string());
    }
}
