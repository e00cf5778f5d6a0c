//! Process exit codes.

use rewind_core::format::{ParseError, ReferenceError};
use rewind_core::matcher::PlaceholderError;

/// Every step passed.
pub const SUCCESS: i32 = 0;
/// At least one step failed or did not run.
pub const FAILURE: i32 = 1;
/// A document, block reference or placeholder is malformed.
pub const STRUCTURAL: i32 = 2;
/// The environment is broken: no shell, unreadable files, bad config.
pub const SETUP: i32 = 3;
/// Interrupted by the operator (128 + SIGINT).
pub const CANCELLED: i32 = 130;

/// Exit code for a command that stopped with `err`.
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<rewind_core::Error>() {
            return e.exit_code();
        }
        if cause.is::<ParseError>() || cause.is::<ReferenceError>() || cause.is::<PlaceholderError>()
        {
            return STRUCTURAL;
        }
    }
    SETUP
}
