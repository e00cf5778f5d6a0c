//! Document model.
//!
//! A `Document` is what a `.rec` or `.recb` file says should happen. An
//! `ActualDocument` is what happened when it was replayed. Step order is
//! significant everywhere: replay and comparison walk steps front to back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────
// Recorded documents
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    Command(CommandStep),
    Comment(CommentStep),
    Block(BlockReference),
}

impl Step {
    pub fn command(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Step::Command(CommandStep::new(input, expected_output))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Step::Comment(CommentStep { text: text.into() })
    }

    pub fn block(path: impl Into<String>) -> Self {
        Step::Block(BlockReference { path: path.into() })
    }

    pub fn as_command(&self) -> Option<&CommandStep> {
        match self {
            Step::Command(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    /// Exact text sent to the shell. May span several lines.
    pub input: String,
    /// Text the command is expected to print. May contain placeholders.
    pub expected_output: String,
    /// Name of an external checker from `––– output: <name> –––`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checker: Option<String>,
    /// Finer-grained structure an editor may attach to a block invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_steps: Option<Vec<Step>>,
}

impl CommandStep {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            checker: None,
            nested_steps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentStep {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReference {
    /// Path relative to the referencing file's directory, without `.recb`.
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

impl Document {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            description: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandStep> {
        self.steps.iter().filter_map(Step::as_command)
    }

    pub fn has_block_references(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, Step::Block(_)))
    }
}

/// A document with every block reference expanded in place.
///
/// Only `flatten` builds these, so `steps` never contains `Step::Block`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedDocument {
    source: PathBuf,
    description: Option<String>,
    steps: Vec<Step>,
    origins: Vec<PathBuf>,
}

impl FlattenedDocument {
    pub(crate) fn new(
        source: PathBuf,
        description: Option<String>,
        steps: Vec<Step>,
        origins: Vec<PathBuf>,
    ) -> Self {
        debug_assert_eq!(steps.len(), origins.len());
        debug_assert!(!steps.iter().any(|s| matches!(s, Step::Block(_))));
        Self {
            source,
            description,
            steps,
            origins,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// File the step at `index` was read from (the root or one of its blocks).
    pub fn origin(&self, index: usize) -> Option<&Path> {
        self.origins.get(index).map(PathBuf::as_path)
    }

    pub fn command_count(&self) -> usize {
        self.steps.iter().filter(|s| s.as_command().is_some()).count()
    }

    pub fn to_document(&self) -> Document {
        Document {
            description: self.description.clone(),
            steps: self.steps.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Replay results
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum ExitState {
    Code(i32),
    Unknown,
}

impl ExitState {
    pub fn code(self) -> Option<i32> {
        match self {
            ExitState::Code(c) => Some(c),
            ExitState::Unknown => None,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ExitState::Code(c) if c != 0)
    }
}

impl From<Option<i32>> for ExitState {
    fn from(code: Option<i32>) -> Self {
        code.map_or(ExitState::Unknown, ExitState::Code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum StepStatus {
    Completed,
    TimedOut,
    Failed(String),
    Skipped,
    Cancelled,
}

impl StepStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepStatus::Completed)
    }

    /// Marker text used in `.rep` files.
    pub fn label(&self) -> String {
        match self {
            StepStatus::Completed => "completed".to_string(),
            StepStatus::TimedOut => "timed out".to_string(),
            StepStatus::Failed(reason) => format!("failed: {}", reason.replace('\n', " ")),
            StepStatus::Skipped => "skipped".to_string(),
            StepStatus::Cancelled => "cancelled".to_string(),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "completed" => Some(StepStatus::Completed),
            "timed out" => Some(StepStatus::TimedOut),
            "skipped" => Some(StepStatus::Skipped),
            "cancelled" => Some(StepStatus::Cancelled),
            other => other
                .strip_prefix("failed: ")
                .map(|r| StepStatus::Failed(r.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualStep {
    pub input: String,
    pub output: String,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub exit: ExitState,
    pub status: StepStatus,
}

impl ActualStep {
    /// Placeholder for a step that never ran.
    pub fn not_run(input: impl Into<String>, status: StepStatus) -> Self {
        Self {
            input: input.into(),
            output: String::new(),
            duration: Duration::ZERO,
            exit: ExitState::Unknown,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActualEntry {
    Command(ActualStep),
    Comment(String),
}

/// Replay results, one entry per step of the flattened source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualDocument {
    pub source: PathBuf,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<ActualEntry>,
}

impl ActualDocument {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn commands(&self) -> impl Iterator<Item = &ActualStep> {
        self.entries.iter().filter_map(|e| match e {
            ActualEntry::Command(s) => Some(s),
            ActualEntry::Comment(_) => None,
        })
    }

    pub fn total_duration(&self) -> Duration {
        self.commands().map(|s| s.duration).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.commands()
            .any(|s| matches!(s.status, StepStatus::Cancelled))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
