//! # sync-core
//!
//! Pure logic for linesync (no I/O, instant tests).
//!
//! This crate implements the diff engine, the diff applier and the
//! reconciliation state machine without any network or disk I/O, enabling
//! fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, disk) is performed by `sync-client`, which
//! interprets the actions produced by [`SyncSession`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod diff;
pub mod session;
pub mod snapshot;

pub use apply::{apply_diffs, MalformedDiffError};
pub use diff::compute_diff;
pub use session::{CycleAction, CycleEvent, CyclePhase, CycleReport, SyncEvent, SyncSession};
pub use snapshot::DocumentSnapshot;
