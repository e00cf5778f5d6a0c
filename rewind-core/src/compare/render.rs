//! Human-readable reports.

use std::fmt::Write as _;
use std::io::IsTerminal;

use crossterm::style::Stylize;

use super::{ComparisonReport, RunOutcome, StepResult, Verdict};
use crate::matcher::{DiffFragment, DiffKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Unified,
    SideBySide { width: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
    pub layout: Layout,
    /// Also print the steps that passed.
    pub verbose: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: false,
            layout: Layout::Unified,
            verbose: false,
        }
    }
}

impl RenderOptions {
    /// Colour decision from `NO_COLOR`, `REWIND_COLOR` and whether stdout is a terminal.
    pub fn from_env() -> Self {
        let color = color_enabled(|k| std::env::var(k).ok(), std::io::stdout().is_terminal());
        Self {
            color,
            ..Self::default()
        }
    }
}

/// `REWIND_COLOR=always|never` wins, then any `NO_COLOR`, then `is_tty`.
pub fn color_enabled(var: impl Fn(&str) -> Option<String>, is_tty: bool) -> bool {
    match var("REWIND_COLOR").as_deref() {
        Some("always") => return true,
        Some("never") => return false,
        _ => {}
    }
    if var("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return false;
    }
    is_tty
}

pub fn render(report: &ComparisonReport, opts: &RenderOptions) -> String {
    let mut out = String::new();

    for step in &report.steps {
        if step.verdict == Verdict::Pass && !opts.verbose {
            continue;
        }
        render_step(&mut out, step, opts);
    }

    let failed = report.failures().count();
    let total = report.steps.len();
    let summary = match report.outcome {
        RunOutcome::Passed => format!("PASSED: {total} of {total} steps"),
        RunOutcome::Failed => format!("FAILED: {failed} of {total} steps"),
        RunOutcome::Cancelled => format!("CANCELLED after {} steps", completed_count(report)),
    };
    let summary = match (opts.color, report.outcome) {
        (false, _) => summary,
        (true, RunOutcome::Passed) => summary.green().bold().to_string(),
        (true, RunOutcome::Failed) => summary.red().bold().to_string(),
        (true, RunOutcome::Cancelled) => summary.yellow().bold().to_string(),
    };
    let _ = writeln!(out, "{}: {summary}", report.source.display());
    out
}

fn completed_count(report: &ComparisonReport) -> usize {
    report
        .steps
        .iter()
        .filter(|s| s.status.is_completed())
        .count()
}

fn render_step(out: &mut String, step: &StepResult, opts: &RenderOptions) {
    let tag = match (step.verdict, opts.color) {
        (Verdict::Pass, false) => "[PASS]".to_string(),
        (Verdict::Fail, false) => "[FAIL]".to_string(),
        (Verdict::Pass, true) => "[PASS]".green().to_string(),
        (Verdict::Fail, true) => "[FAIL]".red().bold().to_string(),
    };
    let first_line = step.input.lines().next().unwrap_or("");
    let _ = writeln!(out, "{tag} #{} $ {first_line}", step.step_index + 1);

    if let Some(note) = &step.note {
        let _ = writeln!(out, "       {note}");
    }
    if step.diff.is_empty() {
        return;
    }

    match opts.layout {
        Layout::Unified => {
            for frag in &step.diff {
                unified_fragment(out, frag, opts.color);
            }
        }
        Layout::SideBySide { width } => {
            let col = (width.saturating_sub(3) / 2).max(8);
            for frag in &step.diff {
                side_by_side_fragment(out, frag, col, opts.color);
            }
        }
    }
}

fn unified_fragment(out: &mut String, frag: &DiffFragment, color: bool) {
    let expected = frag.expected.as_deref().unwrap_or("");
    let actual = frag.actual.as_deref().unwrap_or("");

    match frag.kind {
        DiffKind::Same => {
            let _ = writeln!(out, "  {actual}");
        }
        DiffKind::Removed => {
            let line = format!("- {expected}");
            let _ = writeln!(out, "{}", paint(&line, color, Paint::Removed));
        }
        DiffKind::Added => {
            let line = format!("+ {actual}");
            let _ = writeln!(out, "{}", paint(&line, color, Paint::Added));
        }
        DiffKind::Changed => {
            let line = format!("- {expected}");
            let _ = writeln!(out, "{}", paint(&line, color, Paint::Removed));
            let _ = writeln!(out, "+ {}", highlighted(actual, frag, color));
        }
    }
}

fn side_by_side_fragment(out: &mut String, frag: &DiffFragment, col: usize, color: bool) {
    let (left, mark, right, paint_as) = match frag.kind {
        DiffKind::Same => (frag.expected.as_deref(), ' ', frag.actual.as_deref(), None),
        DiffKind::Removed => (frag.expected.as_deref(), '<', None, Some(Paint::Removed)),
        DiffKind::Added => (None, '>', frag.actual.as_deref(), Some(Paint::Added)),
        DiffKind::Changed => (
            frag.expected.as_deref(),
            '|',
            frag.actual.as_deref(),
            Some(Paint::Added),
        ),
    };

    let left = fit(left.unwrap_or(""), col);
    let right = fit(right.unwrap_or(""), col);
    let line = format!("{left} {mark} {right}");
    let line = line.trim_end();
    match paint_as {
        Some(p) => {
            let _ = writeln!(out, "{}", paint(line, color, p));
        }
        None => {
            let _ = writeln!(out, "{line}");
        }
    }
}

/// Pad or cut to exactly `width` chars.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{text}{}", " ".repeat(width - count))
    }
}

#[derive(Debug, Clone, Copy)]
enum Paint {
    Removed,
    Added,
}

fn paint(text: &str, color: bool, p: Paint) -> String {
    if !color {
        return text.to_string();
    }
    match p {
        Paint::Removed => text.red().to_string(),
        Paint::Added => text.green().to_string(),
    }
}

fn highlighted(actual: &str, frag: &DiffFragment, color: bool) -> String {
    let Some(range) = frag.highlight.clone().filter(|_| color) else {
        return paint(actual, color, Paint::Added);
    };

    let chars: Vec<char> = actual.chars().collect();
    let end = range.end.min(chars.len());
    let start = range.start.min(end);
    let head: String = chars[..start].iter().collect();
    let mid: String = chars[start..end].iter().collect();
    let tail: String = chars[end..].iter().collect();

    format!(
        "{}{}{}",
        head.green(),
        mid.green().bold().underlined(),
        tail.green()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_decision() {
        let none = |_: &str| None;
        assert!(color_enabled(none, true));
        assert!(!color_enabled(none, false));

        let no_color = |k: &str| (k == "NO_COLOR").then(|| "1".to_string());
        assert!(!color_enabled(no_color, true));

        let forced = |k: &str| match k {
            "REWIND_COLOR" => Some("always".to_string()),
            "NO_COLOR" => Some("1".to_string()),
            _ => None,
        };
        assert!(color_enabled(forced, false));
    }

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
    }
}
