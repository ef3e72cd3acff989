//! Line-oriented shortest-edit-script diff.
//!
//! Myers' greedy forward algorithm, O((N+M)·D) in the edit distance D, with
//! the full V-array trace kept per round so the edit script can be
//! backtracked exactly. The diff is stable: among equal-length scripts it
//! prefers the earliest alignment (deletions before insertions).
//!
//! No normalization is applied. Flat-file output is position-sensitive, so
//! whitespace and case differences are real differences.

use crate::diff::{DiffKind, DiffRecord, DiffResult};
use crate::text::TextBlob;

/// Compare two text values line by line.
///
/// Matching lines emit `Unchanged` records; lines only in `expected` emit
/// `Deleted`; lines only in `actual` emit `Inserted`. Record line indices
/// refer to the side that carries the line (expected for deletions, actual
/// for insertions and unchanged lines).
pub fn diff_text(expected: &TextBlob, actual: &TextBlob) -> DiffResult {
    let a = expected.lines();
    let b = actual.lines();
    let script = myers_script(a, b);

    let mut records = Vec::with_capacity(script.len());
    for step in script {
        match step {
            EditStep::Keep { a_idx, b_idx } => {
                records.push(DiffRecord::line(
                    DiffKind::Unchanged,
                    b_idx,
                    Some(a[a_idx].clone()),
                    Some(b[b_idx].clone()),
                ));
            }
            EditStep::Delete { a_idx } => {
                records.push(DiffRecord::line(
                    DiffKind::Deleted,
                    a_idx,
                    Some(a[a_idx].clone()),
                    None,
                ));
            }
            EditStep::Insert { b_idx } => {
                records.push(DiffRecord::line(
                    DiffKind::Inserted,
                    b_idx,
                    None,
                    Some(b[b_idx].clone()),
                ));
            }
        }
    }

    DiffResult::new(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditStep {
    Keep { a_idx: usize, b_idx: usize },
    Delete { a_idx: usize },
    Insert { b_idx: usize },
}

/// Greedy forward Myers with per-round V snapshots for backtracking.
fn myers_script(a: &[String], b: &[String]) -> Vec<EditStep> {
    let n = a.len() as i64;
    let m = b.len() as i64;
    let max = n + m;

    if max == 0 {
        return Vec::new();
    }

    let offset = max;
    let width = (2 * max + 1) as usize;
    let mut v = vec![0i64; width];
    let mut trace: Vec<Vec<i64>> = Vec::new();

    'outer: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            // Prefer the deletion branch on ties for earliest alignment.
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                trace.push(v.clone());
                break 'outer;
            }
            k += 2;
        }
    }

    backtrack(a.len() as i64, b.len() as i64, offset, &trace)
}

fn backtrack(n: i64, m: i64, offset: i64, trace: &[Vec<i64>]) -> Vec<EditStep> {
    let mut steps = Vec::new();
    let mut x = n;
    let mut y = m;

    // trace[d] is V before round d; the last snapshot is post-completion.
    let rounds = trace.len().saturating_sub(1);
    for d in (0..rounds as i64).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let idx = (k + offset) as usize;

        let down = k == -d || (k != d && v[idx - 1] < v[idx + 1]);
        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        // Snake back through the matched run.
        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            steps.push(EditStep::Keep {
                a_idx: x as usize,
                b_idx: y as usize,
            });
        }

        if d > 0 {
            if down {
                debug_assert_eq!(x, prev_x);
                steps.push(EditStep::Insert {
                    b_idx: prev_y as usize,
                });
            } else {
                debug_assert_eq!(y, prev_y);
                steps.push(EditStep::Delete {
                    a_idx: prev_x as usize,
                });
            }
            x = prev_x;
            y = prev_y;
        }
    }

    debug_assert_eq!((x, y), (0, 0), "backtrack must land at the origin");
    steps.reverse();
    steps
}
