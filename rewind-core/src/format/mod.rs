//! Session documents on disk and in memory.
//!
//! - `model`: recorded documents (`Document`, `Step`) and replay results (`ActualDocument`)
//! - `marker`: the `––– name –––` separator lines shared by every file kind
//! - `parser` / `serializer`: `.rec` and `.recb` text <-> `Document`
//! - `flatten`: block reference expansion with cycle detection
//! - `source`: where referenced documents are read from (disk, or memory in tests)
//! - `artifact`: `.rep` replay artifacts

pub mod artifact;
pub mod flatten;
pub mod marker;
pub mod model;
pub mod parser;
pub mod serializer;
pub mod source;

pub use artifact::{parse_artifact, serialize_artifact};
pub use flatten::{flatten, load_flattened, resolve_block_path, ReferenceError};
pub use model::{
    ActualDocument, ActualEntry, ActualStep, BlockReference, CommandStep, CommentStep, Document,
    ExitState, FlattenedDocument, Step, StepStatus,
};
pub use parser::{parse, ParseError, ParseErrorKind};
pub use serializer::serialize;
pub use source::{normalize_path, DocumentSource, FsSource, MapSource};

/// Recorded session.
pub const SESSION_EXTENSION: &str = "rec";
/// Reusable block included by reference.
pub const BLOCK_EXTENSION: &str = "recb";
/// Replay artifact written next to the session it came from.
pub const ARTIFACT_EXTENSION: &str = "rep";
