//! Main RelayServer coordination.
//!
//! RelayServer owns one [`ClientBuffer`] per connected client and fans
//! submitted envelopes out to every buffer except the sender's.

use crate::config::Config;
use crate::error::{ProtocolError, ProtocolResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use sync_types::{ClientId, Envelope};

/// `source_id` stamped on envelopes the relay generates itself.
pub const RELAY_SOURCE_ID: &str = "relay";

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, so incrementing needs no lock.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections accepted.
    pub connections_total: AtomicU64,
    /// Connections turned away because the relay was full.
    pub connections_rejected: AtomicU64,
    /// Envelopes submitted for fan-out.
    pub envelopes_submitted: AtomicU64,
    /// Envelope copies placed in other clients' buffers.
    pub envelopes_fanned_out: AtomicU64,
    /// POLL requests answered.
    pub polls_total: AtomicU64,
    /// Envelopes returned by POLL replies (acknowledgements included).
    pub envelopes_delivered: AtomicU64,
    /// Undelivered envelopes discarded on disconnect.
    pub envelopes_dropped: AtomicU64,
    /// Lines discarded as undecodable.
    pub decode_errors: AtomicU64,
}

/// Pending envelopes for one client, in submission order.
#[derive(Debug, Default)]
pub struct ClientBuffer {
    pending: Mutex<Vec<Envelope>>,
}

impl ClientBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an envelope.
    pub fn push(&self, envelope: Envelope) {
        self.lock().push(envelope);
    }

    /// Atomically take every pending envelope.
    pub fn drain(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of pending envelopes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the Vec half-modified.
    fn lock(&self) -> MutexGuard<'_, Vec<Envelope>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Main relay server.
pub struct RelayServer {
    config: Config,
    /// Buffers of connected clients.
    clients: DashMap<ClientId, Arc<ClientBuffer>>,
    /// Counter behind the `User-N` ids.
    next_client: AtomicU64,
    /// Operational metrics (counters).
    metrics: RelayMetrics,
    started_at: Instant,
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("clients_count", &self.clients.len())
            .finish_non_exhaustive()
    }
}

impl RelayServer {
    /// Create a new RelayServer with the given config.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clients: DashMap::new(),
            next_client: AtomicU64::new(1),
            metrics: RelayMetrics::default(),
            started_at: Instant::now(),
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Time since the relay was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Allocate the next `User-N` id.
    pub fn next_client_id(&self) -> ClientId {
        ClientId::sequential(self.next_client.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a client and create its buffer.
    ///
    /// Registering an id that is already present replaces its buffer.
    pub fn register(&self, client: &ClientId) -> Arc<ClientBuffer> {
        let buffer = Arc::new(ClientBuffer::new());
        if self
            .clients
            .insert(client.clone(), Arc::clone(&buffer))
            .is_some()
        {
            tracing::warn!(%client, "replaced existing buffer");
        }

        tracing::debug!(%client, total = self.clients.len(), "registered client");
        buffer
    }

    /// Remove a client's buffer, discarding undelivered envelopes.
    ///
    /// Returns how many envelopes were discarded.
    pub fn deregister(&self, client: &ClientId) -> usize {
        let Some((_, buffer)) = self.clients.remove(client) else {
            return 0;
        };

        let dropped = buffer.drain().len();
        if dropped > 0 {
            self.metrics
                .envelopes_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }

        tracing::debug!(
            %client,
            dropped,
            remaining = self.clients.len(),
            "deregistered client"
        );
        dropped
    }

    /// Fan `envelope` out to every other registered client, then queue a
    /// SYNC_ACK for the sender.
    ///
    /// Returns the number of recipients.
    pub fn submit(&self, sender: &ClientId, envelope: Envelope) -> ProtocolResult<usize> {
        if envelope.is_poll() {
            return Err(ProtocolError::PollSubmitted);
        }
        let own = self.buffer(sender)?;

        // Snapshot targets so no map shard lock is held while buffers are locked.
        let targets: Vec<Arc<ClientBuffer>> = self
            .clients
            .iter()
            .filter(|entry| entry.key() != sender)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for target in &targets {
            target.push(envelope.clone());
        }
        own.push(Envelope::sync_ack(ClientId::new(RELAY_SOURCE_ID)));

        self.metrics
            .envelopes_submitted
            .fetch_add(1, Ordering::Relaxed);
        self.metrics
            .envelopes_fanned_out
            .fetch_add(targets.len() as u64, Ordering::Relaxed);

        tracing::debug!(
            %sender,
            msg_type = %envelope.msg_type,
            recipients = targets.len(),
            "fanned out envelope"
        );
        Ok(targets.len())
    }

    /// Take everything pending for `client`.
    pub fn drain(&self, client: &ClientId) -> ProtocolResult<Vec<Envelope>> {
        let envelopes = self.buffer(client)?.drain();

        self.metrics.polls_total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .envelopes_delivered
            .fetch_add(envelopes.len() as u64, Ordering::Relaxed);
        Ok(envelopes)
    }

    /// Whether `client` is registered.
    pub fn is_registered(&self, client: &ClientId) -> bool {
        self.clients.contains_key(client)
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Whether another client would exceed `max_clients`.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.config.server.max_clients
    }

    /// Envelopes waiting across all buffers.
    pub fn total_pending(&self) -> usize {
        let buffers: Vec<Arc<ClientBuffer>> = self
            .clients
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        buffers.iter().map(|buffer| buffer.len()).sum()
    }

    fn buffer(&self, client: &ClientId) -> ProtocolResult<Arc<ClientBuffer>> {
        self.clients
            .get(client)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ProtocolError::UnknownClient(client.clone()))
    }
}
