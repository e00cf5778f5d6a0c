//! Crate-wide error type.
//!
//! Each subsystem owns a precise error enum; `Error` folds them together
//! for callers that just want `?` to work across module boundaries.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::format::{ParseError, ReferenceError};
use crate::matcher::PlaceholderError;
use crate::replay::ExecError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Problems with the documents themselves, as opposed to the
    /// environment they run in.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::Reference(_) | Error::Placeholder(_)
        )
    }

    /// Process exit status for a run that stopped on this error.
    ///
    /// `2` for malformed documents, `3` for everything that went wrong
    /// before a single step could be judged.
    pub fn exit_code(&self) -> i32 {
        if self.is_structural() {
            2
        } else {
            3
        }
    }
}
