//! `.rep` replay artifacts.
//!
//! Same marker grammar as a session file, with the recorded output
//! replaced by what the replay produced and a few metadata markers after
//! each output section:
//!
//! ```text
//! ––– input –––
//! echo hi
//! ––– output –––
//! hi
//! ––– duration: 3ms (42.86%) –––
//! ––– exit: 0 –––
//! ```
//!
//! `––– status: ... –––` only appears for steps that did not complete.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use super::marker::{self, Marker};
use super::model::{ActualDocument, ActualEntry, ActualStep, ExitState, Step, StepStatus};
use super::parser::{parse_sections, ParseError, ParseErrorKind};
use super::serializer::{push_body, push_line};

pub fn serialize_artifact(doc: &ActualDocument) -> String {
    let total = doc.total_duration().as_secs_f64();
    let mut out = String::new();

    for entry in &doc.entries {
        match entry {
            ActualEntry::Comment(text) => {
                push_line(&mut out, marker::COMMENT);
                push_body(&mut out, text);
            }
            ActualEntry::Command(step) => {
                push_line(&mut out, marker::INPUT);
                push_line(&mut out, &step.input);
                push_line(&mut out, marker::OUTPUT);
                push_body(&mut out, &step.output);

                let share = if total > 0.0 {
                    step.duration.as_secs_f64() / total * 100.0
                } else {
                    0.0
                };
                let duration = Marker::Duration {
                    elapsed: step.duration,
                    share: Some(share),
                };
                push_line(&mut out, &duration.render());

                if let ExitState::Code(code) = step.exit {
                    push_line(&mut out, &Marker::Exit(code).render());
                }
                if !step.status.is_completed() {
                    push_line(&mut out, &Marker::Status(step.status.label()).render());
                }
            }
        }
    }

    out
}

pub fn parse_artifact(text: &str, path: &Path) -> Result<ActualDocument, ParseError> {
    let parsed = parse_sections(text, path)?;
    let mut entries = Vec::with_capacity(parsed.steps.len());

    for parsed_step in parsed.steps {
        match parsed_step.step {
            Step::Comment(c) => entries.push(ActualEntry::Comment(c.text)),
            Step::Command(cmd) => {
                let status = match parsed_step.meta.status.as_deref() {
                    None => StepStatus::Completed,
                    Some(label) => StepStatus::from_label(label).ok_or_else(|| ParseError {
                        file: path.to_path_buf(),
                        line: parsed_step.line,
                        kind: ParseErrorKind::UnknownMarker(format!("status: {label}")),
                    })?,
                };
                entries.push(ActualEntry::Command(ActualStep {
                    input: cmd.input,
                    output: cmd.expected_output,
                    duration: parsed_step.meta.duration.unwrap_or(Duration::ZERO),
                    exit: parsed_step.meta.exit.into(),
                    status,
                }));
            }
            Step::Block(_) => {
                return Err(ParseError {
                    file: path.to_path_buf(),
                    line: parsed_step.line,
                    kind: ParseErrorKind::BlockInArtifact,
                });
            }
        }
    }

    Ok(ActualDocument {
        source: path.with_extension(super::SESSION_EXTENSION),
        started_at: Utc::now(),
        entries,
    })
}
