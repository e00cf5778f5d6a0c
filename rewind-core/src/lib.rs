//! Rewind core library.
//!
//! Records interactive terminal sessions into plain-text `.rec` documents,
//! replays them against a fresh shell, and compares what came back with
//! what was recorded. Expected output may contain placeholders so that
//! volatile text (versions, dates, addresses) does not break a test.
//!
//! Layout:
//! - `format`   : document model, `.rec`/`.recb`/`.rep` parsing and writing, block flattening
//! - `patterns` : named placeholder patterns (`%{SEMVER}` and friends)
//! - `matcher`  : expected-text to regex compilation and line diffs
//! - `recorder` : keystroke-driven session capture
//! - `replay`   : sequential step execution against an `Executor`
//! - `compare`  : per-step verdicts and report rendering
//! - `plan`     : validated, ready-to-run test plans

pub mod compare;
pub mod config;
pub mod detect;
pub mod error;
pub mod format;
pub mod matcher;
pub mod patterns;
pub mod plan;
pub mod pty_manager;
pub mod recorder;
pub mod replay;
pub mod term;

pub use compare::{compare, ComparisonReport, RunOutcome, StepResult, Verdict};
pub use config::Config;
pub use error::{Error, Result};
pub use format::{
    ActualDocument, ActualEntry, ActualStep, BlockReference, CommandStep, CommentStep, Document,
    ExitState, FlattenedDocument, StepStatus, Step,
};
pub use matcher::CompiledMatcher;
pub use patterns::PatternRegistry;
pub use plan::{run_test, TestPlan, TestRun};
pub use recorder::{record, RecordOutcome, RecorderWarning, SessionRecorder};
pub use replay::{replay, ExecOutcome, Executor, ReplayOptions, ReplayRun, SettlePolicy};
