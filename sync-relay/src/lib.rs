//! # sync-relay
//!
//! Fan-out relay server for linesync.
//!
//! This crate implements a relay server that:
//! - Accepts TCP connections from up to `max_clients` editors
//! - Queues every submitted envelope for all other connected clients
//! - Hands each client its queue when it sends a POLL
//! - Never interprets diff payloads (relay is a "dumb pipe")
//!
//! ## Architecture
//!
//! ```text
//! Editor A ──┐                    ┌── Editor B
//!            │  newline JSON/TCP  │
//!            ├───────────────────►│
//!            │                    │
//!        ┌───┴────────────────────┴───┐
//!        │        sync-relay          │
//!        │  ┌─────────────────────┐   │
//!        │  │ per-client buffers  │   │
//!        │  └─────────────────────┘   │
//!        └────────────────────────────┘
//! ```
//!
//! ## Protocol
//!
//! One JSON envelope per line:
//! - POLL → JSON array of pending envelopes (possibly `[]`)
//! - any other type → copied to every other client, SYNC_ACK queued for the sender

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::{ProtocolError, RelayError};
pub use protocol::serve;
pub use server::{ClientBuffer, RelayMetrics, RelayServer, RELAY_SOURCE_ID};
pub use session::Session;
