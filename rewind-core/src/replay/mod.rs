//! Replay.
//!
//! - `executor`: the `Executor` seam and its settle policy
//! - `driver`: walks a flattened document strictly in order
//! - `pty`: long-lived interactive shell in a PTY (the real target)
//! - `process`: one `sh -c` per step, for targets without a PTY

pub mod driver;
pub mod executor;
pub mod process;
pub mod pty;

pub use driver::{replay, ReplayOptions, ReplayOutcome, ReplayRun};
pub use executor::{ExecError, ExecOutcome, Executor, SettlePolicy};
pub use process::ProcessExecutor;
pub use pty::PtyExecutor;
