//! Mock transport for testing.
//!
//! Allows queueing poll results and capturing sent envelopes for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use sync_types::Envelope;

/// Mock transport for testing.
///
/// Allows queueing poll results and capturing sent envelopes for verification.
/// Clones share state, so a test can keep a handle after moving one into a
/// client.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connected_address: Option<String>,
    connect_count: usize,
    sent: Vec<Envelope>,
    poll_queue: VecDeque<Vec<Envelope>>,
    poll_count: usize,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_poll: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of a future `poll()` call.
    ///
    /// Polls with nothing queued return an empty list, like a relay with an
    /// empty buffer.
    pub fn queue_poll(&self, envelopes: Vec<Envelope>) {
        let mut inner = self.inner.lock().unwrap();
        inner.poll_queue.push_back(envelopes);
    }

    /// Get all envelopes that were sent.
    pub fn sent(&self) -> Vec<Envelope> {
        let inner = self.inner.lock().unwrap();
        inner.sent.clone()
    }

    /// Get the last envelope that was sent.
    pub fn last_sent(&self) -> Option<Envelope> {
        let inner = self.inner.lock().unwrap();
        inner.sent.last().cloned()
    }

    /// Number of `poll()` calls that reached the relay.
    pub fn poll_count(&self) -> usize {
        self.inner.lock().unwrap().poll_count
    }

    /// Number of successful `connect()` calls.
    pub fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connect_count
    }

    /// Get the address that was connected to.
    pub fn connected_address(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_address.clone()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    ///
    /// Like a real socket error, this also drops the connection.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next poll() to fail with the given error.
    ///
    /// Like a real socket error, this also drops the connection.
    pub fn fail_next_poll(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_poll = Some(error.to_string());
    }

    /// Clear all state (envelopes, queue, connection).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(error));
        }

        inner.connected = true;
        inner.connect_count += 1;
        inner.connected_address = Some(address.to_string());
        Ok(())
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            inner.connected = false;
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push(envelope.clone());
        Ok(())
    }

    async fn poll(&self) -> Result<Vec<Envelope>, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_poll.take() {
            inner.connected = false;
            return Err(TransportError::ReceiveFailed(error));
        }

        inner.poll_count += 1;
        Ok(inner.poll_queue.pop_front().unwrap_or_default())
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.connected
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        Ok(())
    }
}
