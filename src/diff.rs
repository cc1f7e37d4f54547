//! Myers diff engine
//!
//! Computes a shortest edit script between two ordered sequences (Myers' O(ND)
//! greedy algorithm) and applies it back onto a sequence. The navigator uses it to
//! reconcile a stack against a declarative target list while keeping every route that
//! survives the update (and its pending result) in place.
//!
//! When several minimal scripts exist, the engine prefers deletions over insertions
//! at each step. Callers must only rely on minimality and on
//! `apply_diff(old, &diff(old, new)) == new`, not on a particular op order.

/// A single edit operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp<T> {
    /// Element `old[old_index]` survives as `new[new_index]`
    Keep { old_index: usize, new_index: usize },
    /// `element` is inserted so that it ends up at `new_index`
    Insert { element: T, new_index: usize },
    /// `old[old_index]` is removed
    Delete { old_index: usize },
}

impl<T> DiffOp<T> {
    /// Check if this op changes the sequence
    pub fn is_edit(&self) -> bool {
        !matches!(self, DiffOp::Keep { .. })
    }
}

/// Diff two sequences using `PartialEq` as the element identity.
///
/// # Example
///
/// ```
/// use stack_navigator::diff::{diff, DiffOp};
///
/// let ops = diff(&["a", "b", "c"], &["a", "d", "c"]);
/// assert_eq!(ops.iter().filter(|op| op.is_edit()).count(), 2);
/// ```
pub fn diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<DiffOp<T>> {
    diff_by(old, new, |a, b| a == b)
}

/// Diff two sequences with a custom equality predicate.
pub fn diff_by<T, F>(old: &[T], new: &[T], eq: F) -> Vec<DiffOp<T>>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    let n = old.len();
    let m = new.len();
    if n == 0 && m == 0 {
        return Vec::new();
    }

    let max = n + m;
    let offset = max as isize;
    let n_i = n as isize;
    let m_i = m as isize;

    // v[k + offset] = furthest x reached on diagonal k
    let mut v = vec![0isize; 2 * max + 1];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=(max as isize) {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n_i && y < m_i && eq(&old[x as usize], &new[y as usize]) {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n_i && y >= m_i {
                break 'search;
            }
            k += 2;
        }
    }

    backtrack(&trace, old.len(), new, offset)
}

fn backtrack<T: Clone>(trace: &[Vec<isize>], n: usize, new: &[T], offset: isize) -> Vec<DiffOp<T>> {
    let mut ops = Vec::new();
    let mut x = n as isize;
    let mut y = new.len() as isize;

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;

        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(DiffOp::Keep {
                old_index: (x - 1) as usize,
                new_index: (y - 1) as usize,
            });
            x -= 1;
            y -= 1;
        }

        if d > 0 {
            if x == prev_x {
                ops.push(DiffOp::Insert {
                    element: new[prev_y as usize].clone(),
                    new_index: prev_y as usize,
                });
            } else {
                ops.push(DiffOp::Delete {
                    old_index: prev_x as usize,
                });
            }
        }

        x = prev_x;
        y = prev_y;
    }

    ops.reverse();
    ops
}

/// Grouped view of an op list, as consumed by stack reconciliation.
#[derive(Debug, Clone)]
pub struct DiffPlan<T> {
    /// Old indices to delete, highest first, deduplicated
    pub deletes: Vec<usize>,
    /// Elements to insert, ordered by ascending target index
    pub inserts: Vec<(usize, T)>,
}

impl<T: Clone> DiffPlan<T> {
    /// Group an op list by kind.
    pub fn from_ops(ops: &[DiffOp<T>]) -> Self {
        let mut deletes: Vec<usize> = ops
            .iter()
            .filter_map(|op| match op {
                DiffOp::Delete { old_index } => Some(*old_index),
                _ => None,
            })
            .collect();
        deletes.sort_unstable_by(|a, b| b.cmp(a));
        deletes.dedup();

        let mut inserts: Vec<(usize, T)> = ops
            .iter()
            .filter_map(|op| match op {
                DiffOp::Insert { element, new_index } => Some((*new_index, element.clone())),
                _ => None,
            })
            .collect();
        inserts.sort_by_key(|(index, _)| *index);

        Self { deletes, inserts }
    }

    /// Check if the plan changes nothing
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }

    /// Apply the plan to a materialised list.
    ///
    /// Out-of-bounds deletes are skipped and out-of-bounds inserts append.
    pub fn apply_to(&self, list: &mut Vec<T>) {
        for &index in &self.deletes {
            if index < list.len() {
                list.remove(index);
            }
        }
        for (index, element) in &self.inserts {
            if *index >= list.len() {
                list.push(element.clone());
            } else {
                list.insert(*index, element.clone());
            }
        }
    }
}

/// Apply an op list to `old`, producing the new sequence.
pub fn apply_diff<T: Clone>(old: &[T], ops: &[DiffOp<T>]) -> Vec<T> {
    let mut list = old.to_vec();
    DiffPlan::from_ops(ops).apply_to(&mut list);
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edits<T>(ops: &[DiffOp<T>]) -> usize {
        ops.iter().filter(|op| op.is_edit()).count()
    }

    fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
        let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in 0..a.len() {
            for j in 0..b.len() {
                table[i + 1][j + 1] = if a[i] == b[j] {
                    table[i][j] + 1
                } else {
                    table[i][j + 1].max(table[i + 1][j])
                };
            }
        }
        table[a.len()][b.len()]
    }

    fn assert_minimal_round_trip(old: &[&str], new: &[&str]) {
        let ops = diff(old, new);
        assert_eq!(apply_diff(old, &ops), new.to_vec(), "{old:?} -> {new:?}");
        let expected = old.len() + new.len() - 2 * lcs_len(old, new);
        assert_eq!(edits(&ops), expected, "{old:?} -> {new:?}");
    }

    #[test]
    fn test_both_empty() {
        let ops: Vec<DiffOp<&str>> = diff(&[], &[]);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_insert_only() {
        let ops = diff(&[], &["a", "b"]);
        assert_eq!(
            ops,
            vec![
                DiffOp::Insert {
                    element: "a",
                    new_index: 0
                },
                DiffOp::Insert {
                    element: "b",
                    new_index: 1
                },
            ]
        );
    }

    #[test]
    fn test_delete_only() {
        let ops = diff(&["a", "b"], &[]);
        assert_eq!(
            ops,
            vec![
                DiffOp::Delete { old_index: 0 },
                DiffOp::Delete { old_index: 1 },
            ]
        );
    }

    #[test]
    fn test_single_substitution() {
        let old = ["a", "b", "c"];
        let new = ["a", "d", "c"];
        let ops = diff(&old, &new);

        let keeps: Vec<_> = ops
            .iter()
            .filter(|op| matches!(op, DiffOp::Keep { .. }))
            .collect();
        assert_eq!(
            keeps,
            vec![
                &DiffOp::Keep {
                    old_index: 0,
                    new_index: 0
                },
                &DiffOp::Keep {
                    old_index: 2,
                    new_index: 2
                },
            ]
        );
        assert!(ops.contains(&DiffOp::Delete { old_index: 1 }));
        assert!(ops.contains(&DiffOp::Insert {
            element: "d",
            new_index: 1
        }));
        assert_eq!(edits(&ops), 2);
        assert_eq!(apply_diff(&old, &ops), new.to_vec());
    }

    #[test]
    fn test_identical_sequences_keep_everything() {
        let seq = ["home", "profile", "settings"];
        let ops = diff(&seq, &seq);
        assert_eq!(edits(&ops), 0);
        assert_eq!(ops.len(), 3);
    }

    #[test]
    fn test_minimal_scripts() {
        assert_minimal_round_trip(&["a", "b", "c", "a", "b", "b", "a"], &["c", "b", "a", "b", "a", "c"]);
        assert_minimal_round_trip(&["x"], &["y"]);
        assert_minimal_round_trip(&["a", "b", "c", "d"], &["d", "c", "b", "a"]);
        assert_minimal_round_trip(&["a", "b"], &["b", "a", "b"]);
        assert_minimal_round_trip(&["home", "feed", "post"], &["home", "post"]);
        assert_minimal_round_trip(&["home"], &["home", "feed", "post"]);
    }

    #[test]
    fn test_custom_equality() {
        let old = ["A", "b"];
        let new = ["a", "B"];
        let ops = diff_by(&old, &new, |x, y| x.eq_ignore_ascii_case(y));
        assert_eq!(edits(&ops), 0);
    }

    #[test]
    fn test_out_of_bounds_ops_are_tolerated() {
        let ops = vec![
            DiffOp::Delete { old_index: 10 },
            DiffOp::Insert {
                element: "z",
                new_index: 99,
            },
        ];
        assert_eq!(apply_diff(&["a"], &ops), vec!["a", "z"]);
    }

    #[test]
    fn test_plan_groups_ops() {
        let ops = diff(&["a", "b", "c", "d"], &["b", "x", "d"]);
        let plan = DiffPlan::from_ops(&ops);
        assert_eq!(plan.deletes, vec![2, 0]);
        assert_eq!(plan.inserts, vec![(1, "x")]);
        assert!(!plan.is_empty());
    }
}
