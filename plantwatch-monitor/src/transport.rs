// Plantwatch Monitor - Stream transports
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Stream transports.
//!
//! A [`Transport`] opens [`Subscription`]s; a subscription yields raw
//! message lines until the peer goes away. Reconnecting is the consumer
//! loop's job, not the transport's.

use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;

/// Source of subscriptions to a live reading stream.
#[async_trait]
pub trait Transport: Send {
    /// Open a new subscription. Missed messages are not replayed.
    async fn connect(&mut self) -> Result<Box<dyn Subscription>, TransportError>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;
}

/// One open subscription.
#[async_trait]
pub trait Subscription: Send {
    /// Next raw message line. `Err(TransportError::Closed)` when the peer
    /// ends the stream.
    ///
    /// Must be cancel safe: dropping the future loses no buffered line.
    async fn next_line(&mut self) -> Result<String, TransportError>;
}

// ============================================================================
// TCP
// ============================================================================

/// Newline-delimited JSON over TCP, as served by `plantwatch publish`.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<Box<dyn Subscription>, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| TransportError::Connect {
                endpoint: self.addr.clone(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(TcpSubscription {
            lines: BufReader::new(stream).lines(),
        }))
    }

    fn endpoint(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

struct TcpSubscription {
    lines: Lines<BufReader<TcpStream>>,
}

#[async_trait]
impl Subscription for TcpSubscription {
    async fn next_line(&mut self) -> Result<String, TransportError> {
        // Lines::next_line is cancel safe.
        match self.lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(TransportError::Closed),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Outcome of one connection attempt on a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// The attempt fails.
    Refuse,
    /// The attempt succeeds, delivers the lines, then the peer disconnects.
    Deliver(Vec<String>),
    /// The attempt succeeds, delivers the lines, then stays open and silent.
    Hold(Vec<String>),
}

/// Scripted transport for tests and demos.
///
/// Each connection attempt consumes the next step; once the script is
/// exhausted every attempt is refused.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    script: VecDeque<ScriptStep>,
    attempts: usize,
}

impl MemoryTransport {
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: script.into_iter().collect(),
            attempts: 0,
        }
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<Box<dyn Subscription>, TransportError> {
        self.attempts += 1;
        let (lines, hold) = match self.script.pop_front() {
            Some(ScriptStep::Deliver(lines)) => (lines, false),
            Some(ScriptStep::Hold(lines)) => (lines, true),
            Some(ScriptStep::Refuse) | None => {
                return Err(TransportError::Connect {
                    endpoint: self.endpoint(),
                    reason: "connection refused".to_string(),
                })
            }
        };
        Ok(Box::new(MemorySubscription {
            lines: lines.into(),
            hold,
        }))
    }

    fn endpoint(&self) -> String {
        "memory://script".to_string()
    }
}

struct MemorySubscription {
    lines: VecDeque<String>,
    hold: bool,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_line(&mut self) -> Result<String, TransportError> {
        // Yield so a burst of lines cannot starve other tasks.
        tokio::task::yield_now().await;
        match self.lines.pop_front() {
            Some(line) => Ok(line),
            None if self.hold => std::future::pending().await,
            None => Err(TransportError::Closed),
        }
    }
}
