//! Reconciliation state machine for one editing participant.
//!
//! [`SyncSession`] owns the participant's `current` document and the
//! `last_synced` snapshot it diffs against. One reconciliation cycle runs
//! `Idle → (Sending) → Receiving → Idle`: local changes go out first, then
//! remote batches are merged in arrival order.
//!
//! The machine performs no I/O. Feed it [`CycleEvent`]s and execute the
//! [`CycleAction`]s it returns; `sync-client` does exactly that.

use sync_types::DiffOp;

use crate::apply::{apply_diffs, MalformedDiffError};
use crate::diff::compute_diff;
use crate::snapshot::DocumentSnapshot;

/// Where the session is within a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CyclePhase {
    /// No cycle in progress.
    Idle,
    /// Local diff handed to the transport, awaiting the outcome.
    Sending {
        /// Snapshot the outgoing diff was computed from.
        snapshot: DocumentSnapshot,
        /// Number of ops in the outgoing diff.
        ops: usize,
    },
    /// Poll requested, awaiting remote batches.
    Receiving,
}

/// Inputs to the reconciliation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    /// Start a cycle.
    Tick,
    /// The transport accepted the outgoing diff.
    SendSucceeded,
    /// The transport failed to send the outgoing diff.
    SendFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The poll returned, in arrival order.
    PollSucceeded {
        /// Decoded diff batches.
        batches: Vec<Vec<DiffOp>>,
    },
    /// The poll failed.
    PollFailed {
        /// Error message describing the failure.
        error: String,
    },
}

/// Instructions for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleAction {
    /// Send this diff to the relay and report back with
    /// [`CycleEvent::SendSucceeded`] or [`CycleEvent::SendFailed`].
    Send(Vec<DiffOp>),
    /// Poll the relay and report back with [`CycleEvent::PollSucceeded`] or
    /// [`CycleEvent::PollFailed`].
    Poll,
    /// Save this snapshot as the document on disk.
    Persist(DocumentSnapshot),
    /// Surface an event to the application.
    Emit(SyncEvent),
}

/// Events surfaced to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A local diff was accepted by the transport.
    Sent {
        /// Number of ops sent.
        ops: usize,
    },
    /// Sending failed; the diff is recomputed next cycle.
    SendFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Polling failed.
    PollFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// A remote batch was merged into the document.
    BatchApplied {
        /// Position of the batch within the poll result.
        batch: usize,
        /// Number of ops in the batch.
        ops: usize,
    },
    /// A remote batch could not be applied and was dropped.
    BatchRejected {
        /// Position of the batch within the poll result.
        batch: usize,
        /// Why the batch was rejected.
        error: MalformedDiffError,
    },
    /// The cycle finished.
    CycleCompleted(CycleReport),
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Ops sent to the relay (0 if nothing changed locally or sending failed).
    pub ops_sent: usize,
    /// Remote batches merged.
    pub batches_applied: usize,
    /// Remote batches dropped as malformed.
    pub batches_rejected: usize,
    /// Whether merging changed `current`.
    pub document_changed: bool,
    /// Send or poll failure that ended the cycle early.
    pub failure: Option<String>,
}

/// Reconciliation state for one participant.
#[derive(Debug, Clone)]
pub struct SyncSession {
    current: DocumentSnapshot,
    last_synced: DocumentSnapshot,
    phase: CyclePhase,
    report: CycleReport,
}

impl SyncSession {
    /// Start a session where `document` is both current and synced.
    pub fn new(document: DocumentSnapshot) -> Self {
        Self::with_state(document.clone(), document)
    }

    /// Start a session with local changes already pending.
    pub fn with_state(current: DocumentSnapshot, last_synced: DocumentSnapshot) -> Self {
        Self {
            current,
            last_synced,
            phase: CyclePhase::Idle,
            report: CycleReport::default(),
        }
    }

    /// The working document.
    pub fn current(&self) -> &DocumentSnapshot {
        &self.current
    }

    /// The last snapshot known to match what peers were sent or merged.
    pub fn last_synced(&self) -> &DocumentSnapshot {
        &self.last_synced
    }

    /// Current phase.
    pub fn phase(&self) -> &CyclePhase {
        &self.phase
    }

    /// Check if no cycle is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, CyclePhase::Idle)
    }

    /// Check if local edits are waiting to be sent.
    pub fn has_unsent_changes(&self) -> bool {
        self.current != self.last_synced
    }

    /// Record a local edit.
    ///
    /// Edits made while a send is in flight are not covered by that send;
    /// they go out next cycle.
    pub fn edit(&mut self, snapshot: DocumentSnapshot) {
        self.current = snapshot;
    }

    /// Process an event and return the actions to execute.
    ///
    /// Events that do not fit the current phase are ignored.
    pub fn on_event(&mut self, event: CycleEvent) -> Vec<CycleAction> {
        let phase = std::mem::replace(&mut self.phase, CyclePhase::Idle);

        match (phase, event) {
            (CyclePhase::Idle, CycleEvent::Tick) => {
                self.report = CycleReport::default();
                let diffs = compute_diff(&self.last_synced, &self.current);
                if diffs.is_empty() {
                    self.phase = CyclePhase::Receiving;
                    vec![CycleAction::Poll]
                } else {
                    self.phase = CyclePhase::Sending {
                        snapshot: self.current.clone(),
                        ops: diffs.len(),
                    };
                    vec![CycleAction::Send(diffs)]
                }
            }

            (CyclePhase::Sending { snapshot, ops }, CycleEvent::SendSucceeded) => {
                self.last_synced = snapshot;
                self.report.ops_sent = ops;
                self.phase = CyclePhase::Receiving;
                vec![
                    CycleAction::Emit(SyncEvent::Sent { ops }),
                    CycleAction::Poll,
                ]
            }
            (CyclePhase::Sending { .. }, CycleEvent::SendFailed { error }) => {
                // No poll: merging would advance last_synced past the unsent edit.
                self.report.failure = Some(error.clone());
                let mut actions = vec![CycleAction::Emit(SyncEvent::SendFailed { error })];
                self.finish_cycle(&mut actions);
                actions
            }

            (CyclePhase::Receiving, CycleEvent::PollSucceeded { batches }) => {
                let mut actions = self.merge(batches);
                self.finish_cycle(&mut actions);
                actions
            }
            (CyclePhase::Receiving, CycleEvent::PollFailed { error }) => {
                self.report.failure = Some(error.clone());
                let mut actions = vec![CycleAction::Emit(SyncEvent::PollFailed { error })];
                self.finish_cycle(&mut actions);
                actions
            }

            // Invalid transitions - stay in current phase
            (phase, _) => {
                self.phase = phase;
                vec![]
            }
        }
    }

    fn merge(&mut self, batches: Vec<Vec<DiffOp>>) -> Vec<CycleAction> {
        let mut actions = Vec::new();

        for (batch, ops) in batches.into_iter().enumerate() {
            match apply_diffs(&self.current, &ops) {
                Ok(merged) => {
                    if merged != self.current {
                        self.report.document_changed = true;
                    }
                    self.current = merged;
                    self.last_synced = self.current.clone();
                    self.report.batches_applied += 1;
                    actions.push(CycleAction::Emit(SyncEvent::BatchApplied {
                        batch,
                        ops: ops.len(),
                    }));
                }
                Err(error) => {
                    self.report.batches_rejected += 1;
                    actions.push(CycleAction::Emit(SyncEvent::BatchRejected { batch, error }));
                }
            }
        }

        actions
    }

    fn finish_cycle(&mut self, actions: &mut Vec<CycleAction>) {
        self.phase = CyclePhase::Idle;
        if self.report.ops_sent > 0 || self.report.document_changed {
            actions.push(CycleAction::Persist(self.current.clone()));
        }
        actions.push(CycleAction::Emit(SyncEvent::CycleCompleted(
            self.report.clone(),
        )));
    }
}
