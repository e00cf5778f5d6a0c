//! Interactive session capture.

pub mod keys;
pub mod line;
pub mod machine;
pub mod session;

pub use keys::{Key, KeyDecoder};
pub use line::LineBuffer;
pub use machine::{Action, RecordOutcome, RecorderState, RecorderWarning, SessionRecorder};
pub use session::record;
