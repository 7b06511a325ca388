// Plantwatch Monitor - Stream publisher
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Publisher - fans readings out to TCP subscribers as JSON lines.
//!
//! Stands in for the field device: readings come from the generator or a
//! CSV file and go out at a fixed interval to every connected subscriber.
//! Subscribers joining late only see what is published after they join.

use crate::connection::wait_for_shutdown;
use crate::error::{MonitorError, Result};
use plantwatch::{Reading, StreamMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Messages buffered per subscriber before it starts lagging.
const SUBSCRIBER_BUFFER: usize = 1024;

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Delay between two messages.
    pub interval: Duration,
    /// Probability of flagging a message as a network failure.
    pub network_failure_rate: f64,
    /// Seed for the failure draws; entropy when absent.
    pub seed: Option<u64>,
    /// Hold the first message until a subscriber is connected.
    pub wait_for_subscriber: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            network_failure_rate: 0.0,
            seed: None,
            wait_for_subscriber: false,
        }
    }
}

impl PublisherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_network_failure_rate(mut self, rate: f64) -> Self {
        self.network_failure_rate = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_wait_for_subscriber(mut self, wait: bool) -> Self {
        self.wait_for_subscriber = wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.network_failure_rate) {
            return Err(MonitorError::Config(format!(
                "network failure rate must be within [0, 1], got {}",
                self.network_failure_rate
            )));
        }
        if self.interval.is_zero() {
            return Err(MonitorError::Config("publish interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// Totals of one publishing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub published: u64,
    pub network_failures: u64,
    /// Messages sent while nobody was subscribed.
    pub unheard: u64,
    pub subscribers: u64,
}

/// TCP publisher bound to a local address.
pub struct Publisher {
    listener: TcpListener,
    config: PublisherConfig,
}

impl Publisher {
    pub async fn bind(addr: &str, config: PublisherConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Publish every reading, then close all subscriber connections.
    pub async fn run<I>(self, readings: I, mut shutdown: watch::Receiver<bool>) -> Result<PublishStats>
    where
        I: IntoIterator<Item = Reading>,
        I::IntoIter: Send,
    {
        let (tx, _) = broadcast::channel::<Arc<str>>(SUBSCRIBER_BUFFER);
        let joined = Arc::new(Notify::new());
        if let Ok(addr) = self.listener.local_addr() {
            info!("publishing on tcp://{}", addr);
        }

        let subscribers = Arc::new(AtomicU64::new(0));
        let (done, done_signal) = watch::channel(false);
        let accept = tokio::spawn(accept_loop(
            self.listener,
            tx.clone(),
            joined.clone(),
            subscribers.clone(),
            done_signal,
        ));

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut stats = PublishStats::default();
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.config.wait_for_subscriber && tx.receiver_count() == 0 {
            info!("waiting for a subscriber");
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {}
                _ = joined.notified() => {}
            }
        }

        for reading in readings {
            let stopped = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => true,
                _ = ticker.tick() => false,
            };
            if stopped {
                info!("publisher stopping on shutdown");
                break;
            }

            let network_failure = rng.gen_bool(self.config.network_failure_rate);
            let line: Arc<str> = match StreamMessage::from_reading(&reading, network_failure).to_json() {
                Ok(json) => json.into(),
                Err(e) => {
                    warn!(timestamp = reading.timestamp, error = %e, "reading not encoded, skipped");
                    continue;
                }
            };
            stats.published += 1;
            if network_failure {
                stats.network_failures += 1;
            }
            if tx.send(line).is_err() {
                stats.unheard += 1;
            }
        }

        // Subscribers drain what is buffered, then see the channel close.
        drop(tx);
        let _ = done.send(true);
        if let Err(e) = accept.await {
            warn!(error = %e, "accept loop ended abnormally");
        }

        stats.subscribers = subscribers.load(Ordering::SeqCst);
        info!(
            "published {} messages ({} network failures) to {} subscribers",
            stats.published, stats.network_failures, stats.subscribers
        );
        Ok(stats)
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: broadcast::Sender<Arc<str>>,
    joined: Arc<Notify>,
    subscribers: Arc<AtomicU64>,
    mut done: watch::Receiver<bool>,
) {
    let mut feeders = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut done) => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    subscribers.fetch_add(1, Ordering::SeqCst);
                    info!(%peer, "subscriber connected");
                    feeders.spawn(feed_subscriber(socket, peer, tx.subscribe()));
                    joined.notify_one();
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
    drop(tx);
    while feeders.join_next().await.is_some() {}
}

async fn feed_subscriber(mut socket: TcpStream, peer: SocketAddr, mut rx: broadcast::Receiver<Arc<str>>) {
    loop {
        match rx.recv().await {
            Ok(line) => {
                let mut frame = Vec::with_capacity(line.len() + 1);
                frame.extend_from_slice(line.as_bytes());
                frame.push(b'\n');
                if let Err(e) = socket.write_all(&frame).await {
                    debug!(%peer, error = %e, "subscriber gone");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(%peer, skipped, "subscriber lagging, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                let _ = socket.shutdown().await;
                return;
            }
        }
    }
}
