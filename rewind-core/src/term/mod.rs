//! Terminal byte-stream helpers.
//!
//! - `osc`: streaming OSC parser for the shell-integration markers (OSC 133)
//! - `semantic`: prompt/command state derived from those markers
//! - `sanitize`: escape-sequence stripping for captured output
//! - `transcript`: turns one step's raw PTY bytes into the text a test compares

pub mod osc;
pub mod sanitize;
pub mod semantic;
pub mod transcript;

pub use osc::{OscEvent, OscParser};
pub use sanitize::sanitize;
pub use semantic::{ShellPhase, ShellState};
pub use transcript::clean_step_output;
