//! `rewind` command-line front end.
//!
//! Everything interesting lives in `rewind-core`; this crate parses
//! arguments, loads configuration and patterns, wires the terminal and
//! maps outcomes to process exit codes.

pub mod args;
pub mod commands;
pub mod exit;
pub mod router;
pub mod terminal;

pub use args::{Cli, ColorChoice, Commands, ReportArgs};
