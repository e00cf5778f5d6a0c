//! `.rec` / `.recb` parser.
//!
//! Lines before the first marker form the free-text description. After
//! that, every line either opens a new section or is appended verbatim to
//! the section that is currently open. Trailing blank lines of a section
//! are dropped; everything else is kept byte for byte, including a `\r`
//! before the line break. Only input lines lose it, since they are typed
//! back into a shell.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::marker::{self, Marker, MarkerError};
use super::model::{BlockReference, CommandStep, CommentStep, Document, Step};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{line}: {kind}", file.display())]
pub struct ParseError {
    pub file: PathBuf,
    /// 1-based line number of the offending line.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("output marker without a preceding input section")]
    OutputWithoutInput,
    #[error("input section is empty")]
    EmptyInput,
    #[error("input section is never followed by an output marker")]
    UnterminatedStep,
    #[error("unknown marker `{0}`")]
    UnknownMarker(String),
    #[error("malformed block reference `{0}`")]
    MalformedBlock(String),
    #[error("content after a block reference")]
    ContentAfterBlock,
    #[error("block reference inside a replay artifact")]
    BlockInArtifact,
}

/// Replay metadata that followed a command's output section.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StepMeta {
    pub duration: Option<Duration>,
    pub exit: Option<i32>,
    pub status: Option<String>,
}

/// One parsed step plus the line it started on.
#[derive(Debug, Clone)]
pub(crate) struct ParsedStep {
    pub step: Step,
    pub line: usize,
    pub meta: StepMeta,
}

#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub description: Option<String>,
    pub steps: Vec<ParsedStep>,
}

/// Parse a session or block file.
///
/// `path` is only used for error messages.
pub fn parse(text: &str, path: &Path) -> Result<Document, ParseError> {
    let parsed = parse_sections(text, path)?;
    Ok(Document {
        description: parsed.description,
        steps: parsed.steps.into_iter().map(|p| p.step).collect(),
    })
}

enum Section<'a> {
    Preamble(Vec<&'a str>),
    Input {
        start: usize,
        lines: Vec<&'a str>,
    },
    Output {
        start: usize,
        input: String,
        checker: Option<String>,
        lines: Vec<&'a str>,
        meta: StepMeta,
    },
    Comment {
        start: usize,
        lines: Vec<&'a str>,
    },
    AfterBlock,
}

pub(crate) fn parse_sections(text: &str, path: &Path) -> Result<ParsedFile, ParseError> {
    let fail = |line: usize, kind: ParseErrorKind| ParseError {
        file: path.to_path_buf(),
        line,
        kind,
    };

    let mut description = None;
    let mut steps = Vec::new();
    let mut section = Section::Preamble(Vec::new());

    for (idx, raw) in split_lines(text).enumerate() {
        let line_no = idx + 1;

        let marker = match marker::classify(raw) {
            None => {
                match &mut section {
                    Section::Input { lines, .. } => {
                        lines.push(raw.strip_suffix('\r').unwrap_or(raw));
                    }
                    Section::Preamble(lines)
                    | Section::Output { lines, .. }
                    | Section::Comment { lines, .. } => lines.push(raw),
                    Section::AfterBlock => {
                        if !raw.trim().is_empty() {
                            return Err(fail(line_no, ParseErrorKind::ContentAfterBlock));
                        }
                    }
                }
                continue;
            }
            Some(Err(MarkerError::Unknown(m))) => {
                return Err(fail(line_no, ParseErrorKind::UnknownMarker(m)));
            }
            Some(Err(MarkerError::MalformedBlock(p))) => {
                return Err(fail(line_no, ParseErrorKind::MalformedBlock(p)));
            }
            Some(Ok(m)) => m,
        };

        if marker.is_metadata() {
            if let Section::Output { meta, .. } = &mut section {
                apply_meta(meta, marker);
            }
            continue;
        }

        if let Marker::Output { checker } = marker {
            section = match section {
                Section::Input { start, lines } => {
                    let input = join_trimmed(&lines);
                    if input.trim().is_empty() {
                        return Err(fail(start, ParseErrorKind::EmptyInput));
                    }
                    Section::Output {
                        start,
                        input,
                        checker,
                        lines: Vec::new(),
                        meta: StepMeta::default(),
                    }
                }
                _ => return Err(fail(line_no, ParseErrorKind::OutputWithoutInput)),
            };
            continue;
        }

        close_section(section, &mut description, &mut steps).map_err(|(l, k)| fail(l, k))?;

        section = match marker {
            Marker::Input => Section::Input {
                start: line_no,
                lines: Vec::new(),
            },
            Marker::Comment => Section::Comment {
                start: line_no,
                lines: Vec::new(),
            },
            Marker::Block(path) => {
                steps.push(ParsedStep {
                    step: Step::Block(BlockReference { path }),
                    line: line_no,
                    meta: StepMeta::default(),
                });
                Section::AfterBlock
            }
            // Output and metadata were handled above.
            _ => Section::AfterBlock,
        };
    }

    close_section(section, &mut description, &mut steps).map_err(|(l, k)| fail(l, k))?;

    Ok(ParsedFile { description, steps })
}

fn close_section(
    section: Section<'_>,
    description: &mut Option<String>,
    steps: &mut Vec<ParsedStep>,
) -> Result<(), (usize, ParseErrorKind)> {
    match section {
        Section::Preamble(lines) => {
            let text = join_trimmed(&lines);
            let text = text.trim_start_matches('\n');
            if !text.trim().is_empty() {
                *description = Some(text.to_string());
            }
        }
        Section::Input { start, .. } => return Err((start, ParseErrorKind::UnterminatedStep)),
        Section::Output {
            start,
            input,
            checker,
            lines,
            meta,
        } => steps.push(ParsedStep {
            step: Step::Command(CommandStep {
                input,
                expected_output: join_trimmed(&lines),
                checker,
                nested_steps: None,
            }),
            line: start,
            meta,
        }),
        Section::Comment { start, lines } => steps.push(ParsedStep {
            step: Step::Comment(CommentStep {
                text: join_trimmed(&lines),
            }),
            line: start,
            meta: StepMeta::default(),
        }),
        Section::AfterBlock => {}
    }
    Ok(())
}

fn apply_meta(meta: &mut StepMeta, marker: Marker) {
    match marker {
        Marker::Duration { elapsed, .. } => meta.duration = Some(elapsed),
        Marker::Exit(code) => meta.exit = Some(code),
        Marker::Status(label) => meta.status = Some(label),
        _ => {}
    }
}

/// Lines split on `\n` alone; a final line break does not open an empty line.
fn split_lines(text: &str) -> std::str::Split<'_, char> {
    text.strip_suffix('\n').unwrap_or(text).split('\n')
}

/// Join lines with `\n`, dropping trailing whitespace-only lines.
fn join_trimmed(lines: &[&str]) -> String {
    let end = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}
