//! Transport abstraction for linesync.
//!
//! This module provides a pluggable transport layer that abstracts
//! the connection to the relay (TCP, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection
//! - `send()` hands one envelope to the relay for fan-out
//! - `poll()` drains this client's pending envelopes, waiting a bounded time
//! - `close()` gracefully terminates
//!
//! A failed operation leaves the transport disconnected when the connection
//! is no longer usable; callers reconnect on their next attempt.
//!
//! # Example
//!
//! ```ignore
//! let transport = TcpTransport::new(Duration::from_millis(100));
//! transport.connect("127.0.0.1:65432").await?;
//! transport.send(&envelope).await?;
//! let pending = transport.poll().await?;
//! ```

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use sync_types::Envelope;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The relay sent something that is not a valid reply.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Transport trait for exchanging envelopes with the relay.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the relay at `address` (`host:port` for TCP).
    async fn connect(&self, address: &str) -> Result<(), TransportError>;

    /// Send one envelope.
    ///
    /// `Ok` means the relay accepted it for delivery, not that peers saw it.
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Drain envelopes the relay buffered for this client, in arrival order.
    ///
    /// Waits a bounded time and returns an empty list if nothing arrives.
    async fn poll(&self) -> Result<Vec<Envelope>, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully.
    async fn close(&self) -> Result<(), TransportError>;
}
