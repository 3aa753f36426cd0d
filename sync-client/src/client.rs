//! SyncClient - the reconciliation loop driver for linesync.
//!
//! This module provides [`SyncClient`], which connects a [`SyncSession`] to
//! the relay.
//!
//! # Architecture
//!
//! SyncClient uses a pure state machine (from sync-core) for reconciliation
//! logic and interprets the actions to perform actual I/O via the Transport
//! trait and an optional [`DocumentStore`].
//!
//! ```text
//! Editor → SyncSession ⇄ SyncClient → Transport → Relay
//!                            ↓
//!                      DocumentStore
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sync_client::{SyncClient, SyncConfig, TcpTransport};
//!
//! let config = SyncConfig::new("127.0.0.1:65432");
//! let transport = TcpTransport::new(config.source_id.clone(), config.poll_timeout);
//! let client = SyncClient::new(config, transport);
//!
//! let mut session = SyncSession::new(store.load().await?);
//! session.edit(edited);
//! let report = client.run_cycle(&mut session, Some(&store)).await;
//! ```

use std::collections::VecDeque;
use std::time::Duration;
use sync_core::{CycleAction, CycleEvent, CycleReport, SyncEvent, SyncSession};
use sync_types::{ClientId, DiffOp, Envelope, MessageType, DEFAULT_DIFF_TYPE};
use thiserror::Error;

use crate::store::{DocumentStore, StoreError};
use crate::transport::{Transport, TransportError};

/// Relay address used when none is configured.
pub const DEFAULT_RELAY_ADDRESS: &str = "127.0.0.1:65432";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration for SyncClient.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Id stamped on outgoing envelopes.
    pub source_id: ClientId,
    /// Address of the relay (`host:port`).
    pub relay_address: String,
    /// Envelope type carrying diff batches.
    pub diff_type: String,
    /// Bounded wait for a poll reply.
    pub poll_timeout: Duration,
    /// Time between reconciliation cycles.
    pub poll_interval: Duration,
}

impl SyncConfig {
    /// Create a configuration for the relay at `relay_address` with a random
    /// source id.
    pub fn new(relay_address: &str) -> Self {
        Self {
            source_id: ClientId::random(),
            relay_address: relay_address.to_string(),
            diff_type: DEFAULT_DIFF_TYPE.to_string(),
            poll_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Set the source id.
    pub fn with_source_id(mut self, source_id: ClientId) -> Self {
        self.source_id = source_id;
        self
    }

    /// Set the envelope type used for diffs.
    pub fn with_diff_type(mut self, diff_type: &str) -> Self {
        self.diff_type = diff_type.to_string();
        self
    }

    /// Set the poll reply timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the cycle interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_ADDRESS)
    }
}

/// The main sync client.
///
/// Owns the transport and drives reconciliation cycles for a
/// [`SyncSession`]. Connection is lazy: every operation connects first if
/// the transport is down, so a relay restart heals on the next cycle.
pub struct SyncClient<T: Transport> {
    config: SyncConfig,
    transport: T,
}

impl<T: Transport> SyncClient<T> {
    /// Create a new SyncClient.
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// The client configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check if the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connect to the relay unless already connected.
    pub async fn connect(&self) -> Result<(), ClientError> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect(&self.config.relay_address).await?;
        tracing::info!(
            relay = %self.config.relay_address,
            source_id = %self.config.source_id,
            "connected"
        );
        Ok(())
    }

    /// Disconnect from the relay.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.transport.close().await?;
        Ok(())
    }

    /// Send one diff batch to the relay.
    pub async fn send_diffs(&self, ops: &[DiffOp]) -> Result<(), ClientError> {
        let envelope = Envelope::diff(
            self.config.diff_type.as_str(),
            self.config.source_id.clone(),
            ops,
        )
        .map_err(|e| ClientError::Serialization(e.to_string()))?;

        self.connect().await?;
        self.transport.send(&envelope).await?;
        Ok(())
    }

    /// Poll the relay for diff batches sent by other clients.
    ///
    /// Batches come back in arrival order. Acknowledgements, envelopes of
    /// other types and envelopes whose payload does not decode are skipped.
    pub async fn poll_diffs(&self) -> Result<Vec<Vec<DiffOp>>, ClientError> {
        self.connect().await?;
        let envelopes = self.transport.poll().await?;

        let mut batches = Vec::new();
        for envelope in envelopes {
            match envelope.message_type() {
                MessageType::Data(kind) if kind == self.config.diff_type => {
                    match envelope.diff_ops() {
                        Ok(ops) => batches.push(ops),
                        Err(e) => tracing::warn!(
                            source_id = %envelope.source_id,
                            error = %e,
                            "skipping undecodable diff"
                        ),
                    }
                }
                MessageType::SyncAck => tracing::trace!("relay acknowledged"),
                other => tracing::debug!(
                    msg_type = other.as_str(),
                    source_id = %envelope.source_id,
                    "ignoring envelope"
                ),
            }
        }

        Ok(batches)
    }

    /// Run one reconciliation cycle for `session`.
    ///
    /// Communication failures are logged and end the cycle; they never
    /// propagate. When `store` is given, the document is saved whenever the
    /// cycle sent or merged something.
    pub async fn run_cycle(
        &self,
        session: &mut SyncSession,
        store: Option<&dyn DocumentStore>,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        let mut pending: VecDeque<CycleAction> = session.on_event(CycleEvent::Tick).into();

        while let Some(action) = pending.pop_front() {
            match action {
                CycleAction::Send(ops) => {
                    let event = match self.send_diffs(&ops).await {
                        Ok(()) => CycleEvent::SendSucceeded,
                        Err(e) => CycleEvent::SendFailed {
                            error: e.to_string(),
                        },
                    };
                    pending.extend(session.on_event(event));
                }
                CycleAction::Poll => {
                    let event = match self.poll_diffs().await {
                        Ok(batches) => CycleEvent::PollSucceeded { batches },
                        Err(e) => CycleEvent::PollFailed {
                            error: e.to_string(),
                        },
                    };
                    pending.extend(session.on_event(event));
                }
                CycleAction::Persist(snapshot) => {
                    if let Some(store) = store {
                        if let Err(e) = store.save(&snapshot).await {
                            tracing::warn!(error = %e, "failed to save document");
                        }
                    }
                }
                CycleAction::Emit(event) => {
                    if let SyncEvent::CycleCompleted(completed) = &event {
                        report = completed.clone();
                    }
                    log_event(&event);
                }
            }
        }

        report
    }
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::Sent { ops } => tracing::debug!(ops, "sent local changes"),
        SyncEvent::SendFailed { error } => {
            tracing::warn!(%error, "send failed, will retry next cycle")
        }
        SyncEvent::PollFailed { error } => tracing::warn!(%error, "poll failed"),
        SyncEvent::BatchApplied { batch, ops } => {
            tracing::debug!(batch, ops, "applied remote changes")
        }
        SyncEvent::BatchRejected { batch, error } => {
            tracing::warn!(batch, %error, "dropping malformed remote diff")
        }
        SyncEvent::CycleCompleted(report) => tracing::trace!(?report, "cycle completed"),
    }
}
