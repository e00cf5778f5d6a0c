//! Expected vs actual.
//!
//! Walks a flattened document and its replay results index for index.
//! Comments are skipped; every command step gets a `Pass` or `Fail`. A
//! step that did not complete fails whatever it printed, and a step
//! present on only one side fails too.

pub mod render;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::format::{ActualEntry, ActualStep, ExitState, FlattenedDocument, Step, StepStatus};
use crate::matcher::{CompiledMatcher, DiffFragment, PlaceholderError};
use crate::patterns::PatternRegistry;

pub use render::{render, Layout, RenderOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Passed,
    Failed,
    Cancelled,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed => 1,
            RunOutcome::Cancelled => 130,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Index into the flattened document's steps.
    pub step_index: usize,
    pub input: String,
    pub verdict: Verdict,
    pub expected_rendered: String,
    pub actual_text: String,
    /// Empty for passing steps.
    pub diff: Vec<DiffFragment>,
    pub status: StepStatus,
    pub exit: ExitState,
    /// Why the step failed when the output alone does not say.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub source: PathBuf,
    pub steps: Vec<StepResult>,
    pub passed: bool,
    pub outcome: RunOutcome,
}

impl ComparisonReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.verdict == Verdict::Fail)
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Compile the expectations of every command step (`None` for comments).
pub fn compile_matchers(
    expected: &FlattenedDocument,
    registry: &PatternRegistry,
) -> Result<Vec<Option<CompiledMatcher>>, PlaceholderError> {
    expected
        .steps()
        .iter()
        .enumerate()
        .map(|(index, step)| match step {
            Step::Command(cmd) => CompiledMatcher::compile(&cmd.expected_output, registry)
                .map(Some)
                .map_err(|e| {
                    let file = expected.origin(index).unwrap_or(expected.source());
                    e.in_step(file, index + 1)
                }),
            _ => Ok(None),
        })
        .collect()
}

pub fn compare(
    expected: &FlattenedDocument,
    actual: &crate::format::ActualDocument,
    registry: &PatternRegistry,
) -> Result<ComparisonReport, PlaceholderError> {
    let matchers = compile_matchers(expected, registry)?;
    Ok(compare_with_matchers(expected, &matchers, actual))
}

/// `matchers` must come from `compile_matchers(expected, ..)`.
pub fn compare_with_matchers(
    expected: &FlattenedDocument,
    matchers: &[Option<CompiledMatcher>],
    actual: &crate::format::ActualDocument,
) -> ComparisonReport {
    let expected_steps = expected.steps();
    let len = expected_steps.len().max(actual.entries.len());
    let mut steps = Vec::new();

    for index in 0..len {
        let exp = expected_steps.get(index).and_then(Step::as_command);
        let act = match actual.entries.get(index) {
            Some(ActualEntry::Command(s)) => Some(s),
            _ => None,
        };

        let result = match (exp, act) {
            (Some(cmd), Some(act)) => match matchers.get(index).and_then(Option::as_ref) {
                Some(matcher) => judge(index, &cmd.input, matcher, act),
                None => unmatched_actual(index, act),
            },
            (Some(cmd), None) => missing_actual(index, &cmd.input, &cmd.expected_output),
            (None, Some(act)) => unmatched_actual(index, act),
            (None, None) => continue,
        };

        debug!(step = index, verdict = ?result.verdict, "compared");
        steps.push(result);
    }

    let cancelled = actual.was_cancelled();
    let passed = !cancelled && steps.iter().all(|s| s.verdict == Verdict::Pass);
    let outcome = if cancelled {
        RunOutcome::Cancelled
    } else if passed {
        RunOutcome::Passed
    } else {
        RunOutcome::Failed
    };

    ComparisonReport {
        source: expected.source().to_path_buf(),
        steps,
        passed,
        outcome,
    }
}

fn judge(index: usize, input: &str, matcher: &CompiledMatcher, act: &ActualStep) -> StepResult {
    let mut note = None;
    let mut ok = true;

    if act.input != input {
        ok = false;
        note = Some(format!("replayed input differs: `{}`", act.input));
    } else if !act.status.is_completed() {
        ok = false;
        note = Some(format!("step {}", act.status.label()));
    }

    let output_ok = matcher.matches(&act.output);
    let verdict = if ok && output_ok {
        Verdict::Pass
    } else {
        Verdict::Fail
    };
    let diff = if output_ok {
        Vec::new()
    } else {
        matcher.explain(&act.output)
    };

    StepResult {
        step_index: index,
        input: input.to_string(),
        verdict,
        expected_rendered: matcher.render_expected().to_string(),
        actual_text: act.output.clone(),
        diff,
        status: act.status.clone(),
        exit: act.exit,
        note,
    }
}

fn missing_actual(index: usize, input: &str, expected: &str) -> StepResult {
    StepResult {
        step_index: index,
        input: input.to_string(),
        verdict: Verdict::Fail,
        expected_rendered: expected.to_string(),
        actual_text: String::new(),
        diff: expected
            .lines()
            .enumerate()
            .map(|(i, line)| DiffFragment::missing(i, line))
            .collect(),
        status: StepStatus::Skipped,
        exit: ExitState::Unknown,
        note: Some("no replay result for this step".to_string()),
    }
}

fn unmatched_actual(index: usize, act: &ActualStep) -> StepResult {
    StepResult {
        step_index: index,
        input: act.input.clone(),
        verdict: Verdict::Fail,
        expected_rendered: String::new(),
        actual_text: act.output.clone(),
        diff: act
            .output
            .lines()
            .enumerate()
            .map(|(i, line)| DiffFragment::unexpected(i, line))
            .collect(),
        status: act.status.clone(),
        exit: act.exit,
        note: Some("replay result has no matching recorded step".to_string()),
    }
}
