//! Applying diff batches to snapshots.
//!
//! A batch is validated as a whole before anything is touched, then applied
//! tail-first: ops are processed by `max(old_start, old_end)` descending, ties
//! broken by `new_start` descending. Every op still pending lies at or before
//! the current one, so the untouched prefix of the working document stays in
//! old coordinates and no pending op's line numbers shift.

use sync_types::{DiffKind, DiffOp};
use thiserror::Error;

use crate::snapshot::DocumentSnapshot;

/// Why a diff batch was rejected.
///
/// `index` fields refer to positions in the batch as received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedDiffError {
    /// A range starts at line 0.
    #[error("op {index}: {side} range starts at line 0")]
    ZeroStart {
        /// Offending op.
        index: usize,
        /// `"old"` or `"new"`.
        side: &'static str,
    },

    /// A range ends more than one line before it starts.
    #[error("op {index}: invalid {side} range {start}-{end}")]
    InvertedRange {
        /// Offending op.
        index: usize,
        /// `"old"` or `"new"`.
        side: &'static str,
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },

    /// The old range reaches past the end of the document.
    #[error("op {index}: old range {start}-{end} out of bounds for {len} lines")]
    OutOfBounds {
        /// Offending op.
        index: usize,
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Lines in the base document.
        len: usize,
    },

    /// The kind disagrees with which ranges are empty.
    #[error("op {index}: {kind:?} with old length {old_len} and {text_len} text lines")]
    KindMismatch {
        /// Offending op.
        index: usize,
        /// Declared kind.
        kind: DiffKind,
        /// Lines in the old range.
        old_len: usize,
        /// Lines of replacement text.
        text_len: usize,
    },

    /// Two ops touch the same old lines.
    #[error("ops {first} and {second} overlap in old coordinates")]
    Overlap {
        /// Earlier op in document order.
        first: usize,
        /// Later op in document order.
        second: usize,
    },
}

/// Apply `ops` to `base`, producing a new snapshot.
///
/// Fails without side effects if any op is out of bounds for `base`, is
/// internally inconsistent, or overlaps another op.
pub fn apply_diffs(
    base: &DocumentSnapshot,
    ops: &[DiffOp],
) -> Result<DocumentSnapshot, MalformedDiffError> {
    if ops.is_empty() {
        return Ok(base.clone());
    }

    for (index, op) in ops.iter().enumerate() {
        validate_op(index, op, base.len())?;
    }
    validate_layout(ops)?;

    let mut order: Vec<usize> = (0..ops.len()).collect();
    order.sort_by(|&x, &y| ops[y].apply_key().cmp(&ops[x].apply_key()));

    let mut lines = base.to_vec();
    for index in order {
        let op = &ops[index];
        // Inserts have old_end == old_start - 1, so this is an empty range
        // anchored before old line `old_start`.
        lines.splice(op.old_start - 1..op.old_end, op.text.iter().cloned());
    }

    Ok(DocumentSnapshot::new(lines))
}

fn validate_op(index: usize, op: &DiffOp, len: usize) -> Result<(), MalformedDiffError> {
    check_range(index, "old", op.old_start, op.old_end)?;
    check_range(index, "new", op.new_start, op.new_end)?;

    if op.old_end > len {
        return Err(MalformedDiffError::OutOfBounds {
            index,
            start: op.old_start,
            end: op.old_end,
            len,
        });
    }

    let old_len = op.old_len();
    let text_len = op.text.len();
    let consistent = match op.kind {
        DiffKind::Insert => old_len == 0 && text_len > 0,
        DiffKind::Delete => old_len > 0 && text_len == 0,
        DiffKind::Replace => old_len > 0 && text_len > 0,
    };
    if !consistent {
        return Err(MalformedDiffError::KindMismatch {
            index,
            kind: op.kind,
            old_len,
            text_len,
        });
    }

    Ok(())
}

fn check_range(
    index: usize,
    side: &'static str,
    start: usize,
    end: usize,
) -> Result<(), MalformedDiffError> {
    if start == 0 {
        return Err(MalformedDiffError::ZeroStart { index, side });
    }
    if end + 1 < start {
        return Err(MalformedDiffError::InvertedRange {
            index,
            side,
            start,
            end,
        });
    }
    Ok(())
}

/// Check that ops are disjoint in old coordinates.
///
/// Only the old range and the text drive the splice, so new coordinates are
/// not compared across ops; they only order inserts sharing an anchor.
///
/// In document order (by `old_start`, inserts before ranges sharing their
/// anchor) each op must end strictly before the next one starts. For an
/// insert anchored at `p` this rejects `p` falling inside `[s, e]` with
/// `s < p <= e`.
fn validate_layout(ops: &[DiffOp]) -> Result<(), MalformedDiffError> {
    let mut by_position: Vec<usize> = (0..ops.len()).collect();
    by_position.sort_by_key(|&i| (ops[i].old_start, ops[i].old_len() > 0));

    for pair in by_position.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        let (prev, next) = (&ops[first], &ops[second]);

        if prev.old_end >= next.old_start {
            return Err(MalformedDiffError::Overlap { first, second });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compute_diff;
    use proptest::prelude::*;

    fn doc(lines: &[&str]) -> DocumentSnapshot {
        DocumentSnapshot::from(lines)
    }

    fn text(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    // ===========================================
    // Worked Examples
    // ===========================================

    #[test]
    fn applies_replace() {
        let base = doc(&["a", "b", "c"]);
        let ops = vec![DiffOp::replace(2, 2, 2, text(&["X"]))];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["a", "X", "c"]));
    }

    #[test]
    fn applies_delete() {
        let base = doc(&["a", "b", "c"]);
        let ops = vec![DiffOp::delete(3, 3, 3)];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["a", "b"]));
    }

    #[test]
    fn applies_insert_before_anchor() {
        let base = doc(&["a", "c"]);
        let ops = vec![DiffOp::insert(2, 2, text(&["b"]))];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["a", "b", "c"]));
    }

    #[test]
    fn appends_past_last_line() {
        let base = doc(&["a"]);
        let ops = vec![DiffOp::insert(2, 2, text(&["b", "c"]))];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["a", "b", "c"]));
    }

    #[test]
    fn empty_batch_is_identity() {
        let base = doc(&["a", "b"]);
        assert_eq!(apply_diffs(&base, &[]).unwrap(), base);
    }

    // ===========================================
    // Multi-op Ordering
    // ===========================================

    #[test]
    fn multiple_ops_do_not_shift_each_other() {
        // Forward-order application would delete the wrong line after the
        // leading insert shifts everything down by one.
        let old = doc(&["a", "b", "c", "d"]);
        let ops = vec![
            DiffOp::insert(1, 1, text(&["start"])),
            DiffOp::delete(3, 3, 4),
            DiffOp::replace(4, 4, 4, text(&["D"])),
        ];
        assert_eq!(
            apply_diffs(&old, &ops).unwrap(),
            doc(&["start", "a", "b", "D"])
        );
    }

    #[test]
    fn batch_order_does_not_matter() {
        let old = doc(&["a", "b"]);
        let new = doc(&["b", "c"]);
        let mut ops = compute_diff(&old, &new);
        assert_eq!(ops.len(), 2);
        ops.reverse();
        assert_eq!(apply_diffs(&old, &ops).unwrap(), new);
    }

    #[test]
    fn insert_sharing_anchor_with_replace() {
        let base = doc(&["a", "b"]);
        let ops = vec![
            DiffOp::insert(1, 1, text(&["new"])),
            DiffOp::replace(1, 1, 2, text(&["A"])),
        ];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["new", "A", "b"]));
    }

    #[test]
    fn consecutive_inserts_at_same_anchor_keep_order() {
        let base = doc(&["z"]);
        let ops = vec![
            DiffOp::insert(1, 1, text(&["x"])),
            DiffOp::insert(1, 2, text(&["y"])),
        ];
        assert_eq!(apply_diffs(&base, &ops).unwrap(), doc(&["x", "y", "z"]));
    }

    #[test]
    fn remote_diff_applies_to_divergent_document() {
        // Peer computed the diff against ["a", "b", "c"]; we have an extra
        // trailing line that the diff never mentions.
        let ops = compute_diff(&doc(&["a", "b", "c"]), &doc(&["a", "B", "c"]));
        let local = doc(&["a", "b", "c", "local"]);
        assert_eq!(
            apply_diffs(&local, &ops).unwrap(),
            doc(&["a", "B", "c", "local"])
        );
    }

    // ===========================================
    // Malformed Batches
    // ===========================================

    #[test]
    fn start_beyond_document_is_rejected() {
        let base = doc(&["a", "b", "c"]);
        let ops = vec![DiffOp::replace(5, 5, 5, text(&["X"]))];
        let err = apply_diffs(&base, &ops).unwrap_err();
        assert!(matches!(err, MalformedDiffError::OutOfBounds { index: 0, len: 3, .. }));
        assert_eq!(base, doc(&["a", "b", "c"]));
    }

    #[test]
    fn insert_beyond_append_point_is_rejected() {
        let base = doc(&["a"]);
        let ops = vec![DiffOp::insert(3, 3, text(&["x"]))];
        assert!(matches!(
            apply_diffs(&base, &ops),
            Err(MalformedDiffError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn zero_start_is_rejected() {
        let base = doc(&["a"]);
        let mut op = DiffOp::delete(1, 1, 1);
        op.old_start = 0;
        assert_eq!(
            apply_diffs(&base, &[op]),
            Err(MalformedDiffError::ZeroStart {
                index: 0,
                side: "old"
            })
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let base = doc(&["a", "b", "c"]);
        let mut op = DiffOp::delete(3, 3, 3);
        op.old_end = 1;
        assert!(matches!(
            apply_diffs(&base, &[op]),
            Err(MalformedDiffError::InvertedRange { side: "old", .. })
        ));
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let base = doc(&["a", "b", "c", "d"]);
        let ops = vec![
            DiffOp::replace(1, 2, 1, text(&["x"])),
            DiffOp::delete(2, 3, 2),
        ];
        assert_eq!(
            apply_diffs(&base, &ops),
            Err(MalformedDiffError::Overlap {
                first: 0,
                second: 1
            })
        );
    }

    #[test]
    fn insert_inside_replaced_range_is_rejected() {
        let base = doc(&["a", "b", "c"]);
        let ops = vec![
            DiffOp::replace(1, 3, 1, text(&["x"])),
            DiffOp::insert(2, 2, text(&["y"])),
        ];
        assert!(matches!(
            apply_diffs(&base, &ops),
            Err(MalformedDiffError::Overlap { .. })
        ));
    }

    #[test]
    fn reversed_same_anchor_inserts_follow_new_start() {
        let base = doc(&["z"]);
        let ops = vec![
            DiffOp::insert(1, 2, text(&["y"])),
            DiffOp::insert(1, 1, text(&["x"])),
        ];
        assert_eq!(apply_diffs(&base, &ops).unwrap().to_vec(), vec!["x", "y", "z"]);
    }

    #[test]
    fn kind_must_match_ranges() {
        let base = doc(&["a"]);
        let mut op = DiffOp::delete(1, 1, 1);
        op.kind = DiffKind::Insert;
        assert!(matches!(
            apply_diffs(&base, &[op]),
            Err(MalformedDiffError::KindMismatch {
                kind: DiffKind::Insert,
                ..
            })
        ));
    }

    #[test]
    fn new_range_wider_than_text_still_applies() {
        // Hand-written payloads give the new range the old range's extent.
        let base = doc(&["a", "b", "c", "d", "e"]);
        let mut op = DiffOp::replace(3, 4, 3, text(&["remote"]));
        op.new_end = 4;
        assert_eq!(
            apply_diffs(&base, &[op]).unwrap().to_vec(),
            vec!["a", "b", "remote", "e"]
        );
    }

    // ===========================================
    // Properties
    // ===========================================

    fn lines_strategy() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-d]", 0..12)
    }

    proptest! {
        #[test]
        fn diff_then_apply_roundtrips(old in lines_strategy(), new in lines_strategy()) {
            let old = DocumentSnapshot::new(old);
            let new = DocumentSnapshot::new(new);
            let ops = compute_diff(&old, &new);
            prop_assert_eq!(apply_diffs(&old, &ops).unwrap(), new);
        }

        #[test]
        fn self_diff_is_empty(lines in lines_strategy()) {
            let doc = DocumentSnapshot::new(lines);
            prop_assert!(compute_diff(&doc, &doc).is_empty());
            prop_assert_eq!(apply_diffs(&doc, &[]).unwrap(), doc);
        }

        #[test]
        fn diff_output_is_sorted_and_disjoint(old in lines_strategy(), new in lines_strategy()) {
            let old = DocumentSnapshot::new(old);
            let new = DocumentSnapshot::new(new);
            let ops = compute_diff(&old, &new);
            prop_assert_eq!(&ops, &compute_diff(&old, &new));
            for pair in ops.windows(2) {
                prop_assert!(pair[0].old_end < pair[1].old_start);
                prop_assert!(pair[0].new_end < pair[1].new_start);
            }
        }
    }
}
