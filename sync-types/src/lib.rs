//! # sync-types
//!
//! Wire format types for the linesync collaborative editing protocol.
//!
//! This crate provides the foundational types used across all linesync crates:
//! - [`ClientId`] - Identity of a connected client
//! - [`DiffOp`], [`DiffKind`] - Line-range edits exchanged between clients
//! - [`Envelope`], [`MessageType`] - Newline-delimited JSON message wrapper
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod ops;

pub use envelope::{Envelope, MessageType, DEFAULT_DIFF_TYPE};
pub use error::SyncError;
pub use ids::ClientId;
pub use ops::{DiffKind, DiffOp};
