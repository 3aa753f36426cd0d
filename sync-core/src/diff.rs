//! Line diff computation.
//!
//! [`compute_diff`] aligns two snapshots along a longest common subsequence
//! of lines (exact string equality) and reports every maximal non-matching
//! run as one [`DiffOp`].
//!
//! The alignment is deterministic. When the heads of both remaining
//! sequences are equal they are matched (earliest match wins). Otherwise the
//! walk skips an old line if that keeps the LCS length, and a new line only
//! when it has to. Equal inputs therefore always yield the same ops.

use sync_types::DiffOp;

use crate::snapshot::DocumentSnapshot;

/// Compute the ops that turn `old` into `new`.
///
/// Ops are non-overlapping and sorted ascending in both old and new
/// coordinates. Identical inputs yield an empty list.
pub fn compute_diff(old: &DocumentSnapshot, new: &DocumentSnapshot) -> Vec<DiffOp> {
    let a = old.lines();
    let b = new.lines();

    // The walk matches equal heads unconditionally, so the common prefix can be
    // consumed up front without changing the result.
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let a = &a[prefix..];
    let b = &b[prefix..];

    let table = LcsTable::build(a, b);
    let (n, m) = (a.len(), b.len());

    let mut ops = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    let (mut i, mut j) = (0, 0);

    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            if let Some((i0, j0)) = run.take() {
                ops.extend(make_op(prefix, (i0, i), (j0, j), b));
            }
            i += 1;
            j += 1;
            continue;
        }

        run.get_or_insert((i, j));
        if j == m || (i < n && table.get(i + 1, j) >= table.get(i, j + 1)) {
            i += 1;
        } else {
            j += 1;
        }
    }

    if let Some((i0, j0)) = run {
        ops.extend(make_op(prefix, (i0, n), (j0, m), b));
    }

    ops
}

fn make_op(
    offset: usize,
    (i1, i2): (usize, usize),
    (j1, j2): (usize, usize),
    new_lines: &[String],
) -> Option<DiffOp> {
    DiffOp::from_runs(
        offset + i1,
        offset + i2,
        offset + j1,
        offset + j2,
        new_lines[j1..j2].to_vec(),
    )
}

/// Suffix LCS lengths: `get(i, j)` is the LCS length of `a[i..]` and `b[j..]`.
struct LcsTable {
    width: usize,
    cells: Vec<u32>,
}

impl LcsTable {
    fn build(a: &[String], b: &[String]) -> Self {
        let width = b.len() + 1;
        let mut cells = vec![0u32; (a.len() + 1) * width];

        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                cells[i * width + j] = if a[i] == b[j] {
                    cells[(i + 1) * width + j + 1] + 1
                } else {
                    cells[(i + 1) * width + j].max(cells[i * width + j + 1])
                };
            }
        }

        Self { width, cells }
    }

    fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.width + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::DiffKind;

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
    fn single_line_replace() {
        let ops = compute_diff(&doc(&["a", "b", "c"]), &doc(&["a", "X", "c"]));
        assert_eq!(ops, vec![DiffOp::replace(2, 2, 2, text(&["X"]))]);
    }

    #[test]
    fn trailing_delete() {
        let ops = compute_diff(&doc(&["a", "b", "c"]), &doc(&["a", "b"]));
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.kind, DiffKind::Delete);
        assert_eq!((op.old_start, op.old_end), (3, 3));
        assert_eq!((op.new_start, op.new_end), (3, 2));
        assert!(op.text.is_empty());
    }

    #[test]
    fn middle_insert() {
        let ops = compute_diff(&doc(&["a", "c"]), &doc(&["a", "b", "c"]));
        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.kind, DiffKind::Insert);
        assert_eq!((op.old_start, op.old_end), (2, 1));
        assert_eq!((op.new_start, op.new_end), (2, 2));
        assert_eq!(op.text, text(&["b"]));
    }

    // ===========================================
    // Edge Cases
    // ===========================================

    #[test]
    fn identical_inputs_yield_nothing() {
        let a = doc(&["same", "lines", "here"]);
        assert!(compute_diff(&a, &a).is_empty());
        assert!(compute_diff(&DocumentSnapshot::empty(), &DocumentSnapshot::empty()).is_empty());
    }

    #[test]
    fn disjoint_inputs_yield_single_replace() {
        let ops = compute_diff(&doc(&["a", "b", "c"]), &doc(&["x", "y"]));
        assert_eq!(ops, vec![DiffOp::replace(1, 3, 1, text(&["x", "y"]))]);
    }

    #[test]
    fn from_empty_is_single_insert() {
        let ops = compute_diff(&DocumentSnapshot::empty(), &doc(&["x", "y"]));
        assert_eq!(ops, vec![DiffOp::insert(1, 1, text(&["x", "y"]))]);
    }

    #[test]
    fn to_empty_is_single_delete() {
        let ops = compute_diff(&doc(&["x", "y"]), &DocumentSnapshot::empty());
        assert_eq!(ops, vec![DiffOp::delete(1, 2, 1)]);
    }

    #[test]
    fn leading_insert() {
        let ops = compute_diff(&doc(&["b"]), &doc(&["a", "b"]));
        assert_eq!(ops, vec![DiffOp::insert(1, 1, text(&["a"]))]);
    }

    #[test]
    fn several_separate_runs() {
        let old = doc(&["a", "b", "c", "d", "e"]);
        let new = doc(&["a", "B", "c", "e", "f"]);
        let ops = compute_diff(&old, &new);
        assert_eq!(
            ops,
            vec![
                DiffOp::replace(2, 2, 2, text(&["B"])),
                DiffOp::delete(4, 4, 4),
                DiffOp::insert(6, 5, text(&["f"])),
            ]
        );
    }

    #[test]
    fn repeated_lines_prefer_earliest_match() {
        // "x" could align with either copy; the first one wins.
        let ops = compute_diff(&doc(&["x", "y", "x"]), &doc(&["x"]));
        assert_eq!(ops, vec![DiffOp::delete(2, 3, 2)]);
    }

    // ===========================================
    // Properties
    // ===========================================

    #[test]
    fn deterministic_output() {
        let old = doc(&["a", "b", "a", "c", "b", "a"]);
        let new = doc(&["b", "a", "c", "a", "b"]);
        assert_eq!(compute_diff(&old, &new), compute_diff(&old, &new));
    }

    #[test]
    fn ops_are_sorted_and_disjoint() {
        let old = doc(&["1", "2", "3", "4", "5", "6", "7", "8"]);
        let new = doc(&["0", "1", "3", "x", "5", "y", "z", "8", "9"]);
        let ops = compute_diff(&old, &new);
        assert!(ops.len() > 1);
        for pair in ops.windows(2) {
            assert!(pair[0].old_end < pair[1].old_start);
            assert!(pair[0].new_end < pair[1].new_start);
        }
    }
}
