//! Line-range edit operations.
//!
//! A [`DiffOp`] describes how one run of lines in an old document maps to a
//! run of lines in a new document. All ranges are 1-indexed and inclusive:
//! `[start, end]` covers `end - start + 1` lines, and `end == start - 1`
//! denotes an empty range positioned before line `start`.

use serde::{Deserialize, Serialize};

/// Kind of a line-range edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Lines added; the old range is empty.
    Insert,
    /// Lines removed; the new range is empty.
    Delete,
    /// Lines swapped for other lines; both ranges are non-empty.
    Replace,
}

/// A single line-range edit.
///
/// `text` holds the new lines for `Insert` and `Replace`, and is empty for
/// `Delete`. The field aliases accept the legacy editor wire names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffOp {
    /// Edit kind
    #[serde(alias = "type")]
    pub kind: DiffKind,
    /// First old line covered (1-indexed)
    #[serde(alias = "line_start_old")]
    pub old_start: usize,
    /// Last old line covered, `old_start - 1` when empty
    #[serde(alias = "line_end_old")]
    pub old_end: usize,
    /// First new line covered (1-indexed)
    #[serde(alias = "line_start_new")]
    pub new_start: usize,
    /// Last new line covered, `new_start - 1` when empty
    #[serde(alias = "line_end_new")]
    pub new_end: usize,
    /// Replacement lines
    #[serde(default)]
    pub text: Vec<String>,
}

impl DiffOp {
    /// Build an op from 0-based half-open runs `old[i1..i2]` and `new[j1..j2]`.
    ///
    /// The kind is derived from which runs are empty. Returns `None` when both
    /// runs are empty, since that is not an edit.
    pub fn from_runs(i1: usize, i2: usize, j1: usize, j2: usize, text: Vec<String>) -> Option<Self> {
        let kind = match (i1 == i2, j1 == j2) {
            (true, true) => return None,
            (true, false) => DiffKind::Insert,
            (false, true) => DiffKind::Delete,
            (false, false) => DiffKind::Replace,
        };
        Some(Self {
            kind,
            old_start: i1 + 1,
            old_end: i2,
            new_start: j1 + 1,
            new_end: j2,
            text,
        })
    }

    /// Insert `text` before old line `old_start`, landing at `new_start`.
    pub fn insert(old_start: usize, new_start: usize, text: Vec<String>) -> Self {
        Self {
            kind: DiffKind::Insert,
            old_start,
            old_end: old_start.saturating_sub(1),
            new_start,
            new_end: (new_start + text.len()).saturating_sub(1),
            text,
        }
    }

    /// Delete old lines `[old_start, old_end]`; the gap sits before `new_start`.
    pub fn delete(old_start: usize, old_end: usize, new_start: usize) -> Self {
        Self {
            kind: DiffKind::Delete,
            old_start,
            old_end,
            new_start,
            new_end: new_start.saturating_sub(1),
            text: Vec::new(),
        }
    }

    /// Replace old lines `[old_start, old_end]` with `text` starting at `new_start`.
    pub fn replace(old_start: usize, old_end: usize, new_start: usize, text: Vec<String>) -> Self {
        Self {
            kind: DiffKind::Replace,
            old_start,
            old_end,
            new_start,
            new_end: (new_start + text.len()).saturating_sub(1),
            text,
        }
    }

    /// Number of old lines covered.
    pub fn old_len(&self) -> usize {
        (self.old_end + 1).saturating_sub(self.old_start)
    }

    /// Number of new lines covered.
    pub fn new_len(&self) -> usize {
        (self.new_end + 1).saturating_sub(self.new_start)
    }

    /// Key that orders ops for tail-first application.
    ///
    /// Ops are applied by this key descending, then by `new_start` descending.
    pub fn apply_key(&self) -> (usize, usize) {
        (self.old_start.max(self.old_end), self.new_start)
    }
}
