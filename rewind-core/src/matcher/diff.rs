//! Line alignment between expected and actual output.
//!
//! Lines are aligned with a longest-common-subsequence table where
//! "equal" means the expected line's matcher accepts the actual line.
//! Removed/added runs that sit between the same pair of matched lines are
//! paired up into `Changed` fragments. Past `MAX_CELLS` table cells the
//! alignment falls back to comparing line `i` with line `i`.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::LineMatcher;

const MAX_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Same,
    Removed,
    Added,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFragment {
    pub kind: DiffKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// 1-based line numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_line: Option<usize>,
    /// Char range of `actual` that differs from `expected` (changed lines only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Range<usize>>,
}

impl DiffFragment {
    fn same(exp: usize, expected: &str, act: usize, actual: &str) -> Self {
        Self {
            kind: DiffKind::Same,
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            expected_line: Some(exp + 1),
            actual_line: Some(act + 1),
            highlight: None,
        }
    }

    fn removed(exp: usize, expected: &str) -> Self {
        Self {
            kind: DiffKind::Removed,
            expected: Some(expected.to_string()),
            actual: None,
            expected_line: Some(exp + 1),
            actual_line: None,
            highlight: None,
        }
    }

    fn added(act: usize, actual: &str) -> Self {
        Self {
            kind: DiffKind::Added,
            expected: None,
            actual: Some(actual.to_string()),
            expected_line: None,
            actual_line: Some(act + 1),
            highlight: None,
        }
    }

    fn changed(exp: usize, expected: &str, act: usize, actual: &str) -> Self {
        Self {
            kind: DiffKind::Changed,
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            expected_line: Some(exp + 1),
            actual_line: Some(act + 1),
            highlight: Some(changed_span(expected, actual)),
        }
    }

    /// Expected-only line, for steps that produced no actual output at all.
    pub fn missing(line: usize, expected: &str) -> Self {
        Self::removed(line, expected)
    }

    /// Actual-only line, for steps with no expectation.
    pub fn unexpected(line: usize, actual: &str) -> Self {
        Self::added(line, actual)
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Same(usize, usize),
    Removed(usize),
    Added(usize),
}

pub(crate) fn align(
    matchers: &[LineMatcher],
    expected: &[&str],
    actual: &[&str],
) -> Vec<DiffFragment> {
    let n = expected.len();
    let m = actual.len();

    if n.saturating_mul(m) > MAX_CELLS {
        return positional(matchers, expected, actual);
    }

    let eq: Vec<bool> = (0..n)
        .flat_map(|i| (0..m).map(move |j| (i, j)))
        .map(|(i, j)| line_matches(matchers, expected, i, actual[j]))
        .collect();
    let is_eq = |i: usize, j: usize| eq[i * m + j];

    // lcs[i][j] = LCS length of expected[i..] and actual[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if is_eq(i, j) {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if is_eq(i, j) {
            ops.push(Op::Same(i, j));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(Op::Removed(i));
            i += 1;
        } else {
            ops.push(Op::Added(j));
            j += 1;
        }
    }
    ops.extend((i..n).map(Op::Removed));
    ops.extend((j..m).map(Op::Added));

    pair_changes(&ops, expected, actual)
}

fn line_matches(matchers: &[LineMatcher], expected: &[&str], i: usize, actual: &str) -> bool {
    match matchers.get(i) {
        Some(matcher) => matcher.is_match(actual),
        None => expected[i] == actual,
    }
}

fn pair_changes(ops: &[Op], expected: &[&str], actual: &[&str]) -> Vec<DiffFragment> {
    let mut out = Vec::with_capacity(ops.len());
    let mut removed: Vec<usize> = Vec::new();
    let mut added: Vec<usize> = Vec::new();

    let flush = |out: &mut Vec<DiffFragment>, removed: &mut Vec<usize>, added: &mut Vec<usize>| {
        let paired = removed.len().min(added.len());
        for k in 0..paired {
            let (e, a) = (removed[k], added[k]);
            out.push(DiffFragment::changed(e, expected[e], a, actual[a]));
        }
        out.extend(removed[paired..].iter().map(|&e| DiffFragment::removed(e, expected[e])));
        out.extend(added[paired..].iter().map(|&a| DiffFragment::added(a, actual[a])));
        removed.clear();
        added.clear();
    };

    for op in ops {
        match *op {
            Op::Same(e, a) => {
                flush(&mut out, &mut removed, &mut added);
                out.push(DiffFragment::same(e, expected[e], a, actual[a]));
            }
            Op::Removed(e) => removed.push(e),
            Op::Added(a) => added.push(a),
        }
    }
    flush(&mut out, &mut removed, &mut added);
    out
}

fn positional(matchers: &[LineMatcher], expected: &[&str], actual: &[&str]) -> Vec<DiffFragment> {
    let mut out = Vec::with_capacity(expected.len().max(actual.len()));
    for k in 0..expected.len().max(actual.len()) {
        match (expected.get(k), actual.get(k)) {
            (Some(e), Some(a)) if line_matches(matchers, expected, k, a) => {
                out.push(DiffFragment::same(k, e, k, a))
            }
            (Some(e), Some(a)) => out.push(DiffFragment::changed(k, e, k, a)),
            (Some(e), None) => out.push(DiffFragment::removed(k, e)),
            (None, Some(a)) => out.push(DiffFragment::added(k, a)),
            (None, None) => {}
        }
    }
    out
}

/// Chars of `actual` left after stripping the prefix and suffix it shares with `expected`.
fn changed_span(expected: &str, actual: &str) -> Range<usize> {
    let e: Vec<char> = expected.chars().collect();
    let a: Vec<char> = actual.chars().collect();

    let prefix = e.iter().zip(&a).take_while(|(x, y)| x == y).count();
    let max_suffix = e.len().min(a.len()) - prefix;
    let suffix = e
        .iter()
        .rev()
        .zip(a.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();

    prefix..a.len() - suffix
}
