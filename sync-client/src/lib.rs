//! # sync-client
//!
//! Client library for linesync collaborative line editing.
//!
//! This is the library that editing surfaces use to stay in sync with their
//! peers through a relay.
//!
//! ## Features
//!
//! - **Reconciliation Loop**: drives the pure [`sync_core::SyncSession`]
//!   state machine, sending local diffs before merging remote ones
//! - **Transport Abstraction**: Pluggable transport layer (TCP, mock)
//! - **Document Store**: file-backed and in-memory persistence
//!
//! ## Example
//!
//! ```ignore
//! use sync_client::{FileStore, SyncClient, SyncConfig, TcpTransport};
//!
//! let config = SyncConfig::default();
//! let transport = TcpTransport::new(config.source_id.clone(), config.poll_timeout);
//! let client = SyncClient::new(config, transport);
//!
//! let store = FileStore::new("shared_document.txt");
//! let mut session = SyncSession::new(store.load().await?);
//! client.run_cycle(&mut session, Some(&store)).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod store;
pub mod transport;

pub use client::{ClientError, SyncClient, SyncConfig, DEFAULT_RELAY_ADDRESS};
pub use store::{DocumentStore, FileStore, MemoryStore, StoreError, WELCOME_TEXT};
pub use transport::{MockTransport, TcpTransport, Transport, TransportError};
