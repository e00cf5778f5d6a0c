//! Command-completion detection.
//!
//! After a command is sent, the driver needs to know when the shell is
//! back at its prompt. Strategies:
//!
//! 1. `OscMarker`: the shell emits OSC 133 markers; `133;B` means the
//!    prompt is fully drawn. Exact, and carries the exit status (`133;D`).
//! 2. `PromptPattern`: the last line of output matches the prompt regex.
//! 3. `IdleDelay`: no output for a fixed quiet period.
//!
//! `Auto` uses markers once the shell has proven it emits them and the
//! prompt pattern until then.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::term::{sanitize, OscEvent, OscParser, ShellState};

/// Bytes of trailing output kept for prompt matching.
const TAIL_LIMIT: usize = 2048;

pub trait CompletionDetector: Send + std::fmt::Debug {
    /// Forget everything about the previous command.
    fn reset(&mut self);

    fn observe(&mut self, chunk: &[u8]);

    /// `quiet_for` is the time since the last observed chunk.
    fn is_complete(&self, quiet_for: Duration) -> bool;

    /// Exit status of the last command, when the strategy can know it.
    fn exit_code(&self) -> Option<i32> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    Auto,
    Osc,
    Prompt,
    Idle,
}

/// Regex for a prompt line: the prompt text, optionally followed by blanks.
pub fn prompt_regex(prompt: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"^{}\s*$", regex::escape(prompt.trim_end())))
}

pub fn build_detector(
    kind: DetectorKind,
    prompt: &str,
    idle: Duration,
) -> Result<Box<dyn CompletionDetector>, regex::Error> {
    Ok(match kind {
        DetectorKind::Auto => Box::new(AutoDetector::new(prompt_regex(prompt)?)),
        DetectorKind::Osc => Box::new(OscMarker::new()),
        DetectorKind::Prompt => Box::new(PromptPattern::new(prompt_regex(prompt)?)),
        DetectorKind::Idle => Box::new(IdleDelay::new(idle)),
    })
}

// ────────────────────────────────────────────────────────────────
// IdleDelay
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IdleDelay {
    quiet: Duration,
}

impl IdleDelay {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet }
    }
}

impl CompletionDetector for IdleDelay {
    fn reset(&mut self) {}

    fn observe(&mut self, _chunk: &[u8]) {}

    fn is_complete(&self, quiet_for: Duration) -> bool {
        quiet_for >= self.quiet
    }
}

// ────────────────────────────────────────────────────────────────
// PromptPattern
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PromptPattern {
    prompt: Regex,
    tail: Vec<u8>,
}

impl PromptPattern {
    pub fn new(prompt: Regex) -> Self {
        Self {
            prompt,
            tail: Vec::new(),
        }
    }
}

impl CompletionDetector for PromptPattern {
    fn reset(&mut self) {
        self.tail.clear();
    }

    fn observe(&mut self, chunk: &[u8]) {
        self.tail.extend_from_slice(chunk);
        if self.tail.len() > TAIL_LIMIT {
            let excess = self.tail.len() - TAIL_LIMIT;
            self.tail.drain(..excess);
        }
    }

    fn is_complete(&self, _quiet_for: Duration) -> bool {
        let text = sanitize(&self.tail);
        let last = text.rsplit('\n').next().unwrap_or("");
        self.prompt.is_match(last)
    }
}

// ────────────────────────────────────────────────────────────────
// OscMarker
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OscMarker {
    parser: OscParser,
    shell: ShellState,
    prompt_seen: bool,
}

impl OscMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shell has emitted at least one OSC 133 marker.
    pub fn integrated(&self) -> bool {
        self.shell.integrated
    }
}

impl CompletionDetector for OscMarker {
    fn reset(&mut self) {
        self.prompt_seen = false;
        self.shell.command_submitted();
    }

    fn observe(&mut self, chunk: &[u8]) {
        for ev in self.parser.feed(chunk) {
            self.shell.apply(&ev);
            if ev == OscEvent::PromptEnd {
                self.prompt_seen = true;
            }
        }
    }

    fn is_complete(&self, _quiet_for: Duration) -> bool {
        self.prompt_seen
    }

    fn exit_code(&self) -> Option<i32> {
        self.shell.last_exit
    }
}

// ────────────────────────────────────────────────────────────────
// Auto
// ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AutoDetector {
    osc: OscMarker,
    prompt: PromptPattern,
}

impl AutoDetector {
    pub fn new(prompt: Regex) -> Self {
        Self {
            osc: OscMarker::new(),
            prompt: PromptPattern::new(prompt),
        }
    }
}

impl CompletionDetector for AutoDetector {
    fn reset(&mut self) {
        self.osc.reset();
        self.prompt.reset();
    }

    fn observe(&mut self, chunk: &[u8]) {
        self.osc.observe(chunk);
        self.prompt.observe(chunk);
    }

    fn is_complete(&self, quiet_for: Duration) -> bool {
        if self.osc.integrated() {
            self.osc.is_complete(quiet_for)
        } else {
            self.prompt.is_complete(quiet_for)
        }
    }

    fn exit_code(&self) -> Option<i32> {
        self.osc.exit_code()
    }
}
