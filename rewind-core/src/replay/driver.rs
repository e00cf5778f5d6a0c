use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::executor::{Executor, SettlePolicy};
use crate::format::{
    ActualDocument, ActualEntry, ActualStep, ExitState, FlattenedDocument, Step, StepStatus,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    pub settle: SettlePolicy,
    /// Stop at the first step that fails to complete or exits non-zero.
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Every step was submitted.
    Finished,
    /// `fail_fast` tripped; later steps are `Skipped`.
    Stopped { at_step: usize },
    /// Cancelled; the current and later steps are `Cancelled`.
    Cancelled { at_step: usize },
}

#[derive(Debug, Clone)]
pub struct ReplayRun {
    pub actual: ActualDocument,
    pub outcome: ReplayOutcome,
}

/// Execute every command step of `doc`, strictly in order.
///
/// The actual document has one entry per step of `doc`, so the two can be
/// compared index for index.
pub async fn replay(
    doc: &FlattenedDocument,
    executor: &mut dyn Executor,
    options: &ReplayOptions,
    cancel: &CancellationToken,
) -> ReplayRun {
    let mut actual = ActualDocument::new(doc.source());
    let mut outcome = ReplayOutcome::Finished;

    info!(source = %doc.source().display(), steps = doc.command_count(), "replay started");

    for (index, step) in doc.steps().iter().enumerate() {
        let command = match step {
            Step::Command(c) => c,
            Step::Comment(c) => {
                actual.entries.push(ActualEntry::Comment(c.text.clone()));
                continue;
            }
            // flattened documents carry no block references
            Step::Block(_) => continue,
        };

        match outcome {
            ReplayOutcome::Stopped { .. } => {
                actual.entries.push(ActualEntry::Command(ActualStep::not_run(
                    &command.input,
                    StepStatus::Skipped,
                )));
                continue;
            }
            ReplayOutcome::Cancelled { .. } => {
                actual.entries.push(ActualEntry::Command(ActualStep::not_run(
                    &command.input,
                    StepStatus::Cancelled,
                )));
                continue;
            }
            ReplayOutcome::Finished => {}
        }

        if cancel.is_cancelled() {
            executor.terminate().await;
            outcome = ReplayOutcome::Cancelled { at_step: index };
            actual.entries.push(ActualEntry::Command(ActualStep::not_run(
                &command.input,
                StepStatus::Cancelled,
            )));
            continue;
        }

        debug!(step = index, input = %command.input, "submitting step");
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = executor.execute(&command.input, &options.settle) => Some(res),
        };

        let step_result = match result {
            None => {
                warn!(step = index, "replay cancelled");
                executor.terminate().await;
                outcome = ReplayOutcome::Cancelled { at_step: index };
                ActualStep {
                    duration: started.elapsed(),
                    ..ActualStep::not_run(&command.input, StepStatus::Cancelled)
                }
            }
            Some(Ok(out)) => {
                let status = if out.timed_out {
                    warn!(step = index, timeout = ?options.settle.step_timeout, "step timed out");
                    StepStatus::TimedOut
                } else {
                    StepStatus::Completed
                };
                ActualStep {
                    input: command.input.clone(),
                    output: String::from_utf8_lossy(&out.output).into_owned(),
                    duration: started.elapsed(),
                    exit: out.exit,
                    status,
                }
            }
            Some(Err(e)) => {
                warn!(step = index, error = %e, "step failed");
                ActualStep {
                    input: command.input.clone(),
                    output: String::new(),
                    duration: started.elapsed(),
                    exit: ExitState::Unknown,
                    status: StepStatus::Failed(e.to_string()),
                }
            }
        };

        let failed = !step_result.status.is_completed() || step_result.exit.is_failure();
        if options.fail_fast && failed && outcome == ReplayOutcome::Finished {
            info!(step = index, "fail-fast: skipping remaining steps");
            outcome = ReplayOutcome::Stopped { at_step: index };
        }

        actual.entries.push(ActualEntry::Command(step_result));
    }

    info!(?outcome, elapsed = ?actual.total_duration(), "replay finished");
    ReplayRun { actual, outcome }
}
