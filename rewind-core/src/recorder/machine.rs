//! Session recorder state machine.
//!
//! Inputs:
//! - operator keystrokes (raw bytes from the real terminal)
//! - PTY output bytes
//! - clock ticks (completion detection is time-aware)
//! - child exit / operator interrupt
//!
//! Output:
//! - `Action`s for the driver (bytes to forward to the shell, close)
//! - on close, the recorded `Document` plus any warnings
//!
//! The machine does no I/O itself, so every transition can be driven
//! from tests with plain byte slices.

use std::fmt;
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info, warn};

use super::keys::{Key, KeyDecoder};
use super::line::LineBuffer;
use crate::detect::CompletionDetector;
use crate::format::{CommandStep, Document, Step};
use crate::term::clean_step_output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    AwaitingPrompt,
    CapturingInput,
    AwaitingCompletion,
    CapturingOutput,
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write these bytes to the shell.
    Forward(Vec<u8>),
    /// The operator ended the session.
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderWarning {
    /// The shell went away on its own; `steps_kept` steps were saved.
    Truncated { steps_kept: usize },
    /// The recorder itself was interrupted; the step in flight was dropped.
    Interrupted { discarded: Option<String> },
}

impl fmt::Display for RecorderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderWarning::Truncated { steps_kept } => write!(
                f,
                "shell exited unexpectedly; session truncated after {steps_kept} step(s)"
            ),
            RecorderWarning::Interrupted { discarded: Some(input) } => {
                write!(f, "recording interrupted; discarded unfinished step `{input}`")
            }
            RecorderWarning::Interrupted { discarded: None } => {
                f.write_str("recording interrupted")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub document: Document,
    pub warnings: Vec<RecorderWarning>,
}

#[derive(Debug)]
struct PendingStep {
    input: String,
    raw: Vec<u8>,
}

#[derive(Debug)]
pub struct SessionRecorder {
    state: RecorderState,
    decoder: KeyDecoder,
    line: LineBuffer,
    detector: Box<dyn CompletionDetector>,
    prompt: Regex,
    pending: Option<PendingStep>,
    steps: Vec<Step>,
    warnings: Vec<RecorderWarning>,
    description: Option<String>,
    last_output: Instant,
}

impl SessionRecorder {
    /// `prompt` matches a bare prompt line; it is stripped from captured output.
    pub fn new(detector: Box<dyn CompletionDetector>, prompt: Regex) -> Self {
        Self {
            state: RecorderState::AwaitingPrompt,
            decoder: KeyDecoder::new(),
            line: LineBuffer::new(),
            detector,
            prompt,
            pending: None,
            steps: Vec::new(),
            warnings: Vec::new(),
            description: None,
            last_output: Instant::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    /// Feed operator keystrokes.
    pub fn on_key(&mut self, bytes: &[u8], out: &mut Vec<Action>) {
        for (key, raw) in self.decoder.feed(bytes) {
            self.handle_key(key, raw, out);
        }
    }

    /// Give up on a half-typed escape sequence (the driver calls this when
    /// the keyboard goes quiet).
    pub fn flush_keys(&mut self, out: &mut Vec<Action>) {
        if let Some((key, raw)) = self.decoder.flush() {
            self.handle_key(key, raw, out);
        }
    }

    fn handle_key(&mut self, key: Key, raw: Vec<u8>, out: &mut Vec<Action>) {
        match self.state {
            RecorderState::SessionClosed => {}
            RecorderState::AwaitingCompletion | RecorderState::CapturingOutput => {
                // The foreground program owns the keyboard until the prompt returns.
                out.push(Action::Forward(raw));
            }
            RecorderState::AwaitingPrompt | RecorderState::CapturingInput => {
                if self.state == RecorderState::AwaitingPrompt {
                    debug!("key before prompt; capturing input");
                    self.set_state(RecorderState::CapturingInput);
                }
                self.edit(key, raw, out);
            }
        }
    }

    fn edit(&mut self, key: Key, raw: Vec<u8>, out: &mut Vec<Action>) {
        match key {
            Key::Char(c) => self.line.insert(c),
            Key::Left => self.line.left(),
            Key::Right => self.line.right(),
            Key::Home => self.line.home(),
            Key::End => self.line.end(),
            Key::Backspace => self.line.backspace(),
            Key::Delete => self.line.delete(),
            Key::Interrupt => self.line.clear(),
            Key::Enter => {
                out.push(Action::Forward(b"\r".to_vec()));
                self.submit();
                return;
            }
            Key::Eof => {
                if self.line.is_empty() {
                    info!(steps = self.steps.len(), "operator closed the session");
                    self.set_state(RecorderState::SessionClosed);
                    out.push(Action::Close);
                } else {
                    debug!("ctrl-d on a non-empty line ignored");
                }
                return;
            }
            Key::Unsupported(bytes) => {
                debug!(?bytes, "unsupported key swallowed");
                return;
            }
        }
        out.push(Action::Forward(raw));
    }

    fn submit(&mut self) {
        let input = self.line.take();
        if input.trim().is_empty() {
            return;
        }
        debug!(%input, "command submitted");
        self.detector.reset();
        self.pending = Some(PendingStep {
            input,
            raw: Vec::new(),
        });
        self.set_state(RecorderState::AwaitingCompletion);
    }

    /// Feed PTY output.
    pub fn on_output(&mut self, bytes: &[u8], now: Instant) {
        self.last_output = now;
        match self.state {
            RecorderState::AwaitingPrompt => self.detector.observe(bytes),
            RecorderState::AwaitingCompletion | RecorderState::CapturingOutput => {
                self.detector.observe(bytes);
                if let Some(pending) = &mut self.pending {
                    pending.raw.extend_from_slice(bytes);
                    let echoed = pending.raw.contains(&b'\n');
                    if echoed && self.state == RecorderState::AwaitingCompletion {
                        self.set_state(RecorderState::CapturingOutput);
                    }
                }
            }
            RecorderState::CapturingInput | RecorderState::SessionClosed => {}
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        let quiet = now.saturating_duration_since(self.last_output);
        match self.state {
            RecorderState::AwaitingPrompt => {
                if self.detector.is_complete(quiet) {
                    self.set_state(RecorderState::CapturingInput);
                }
            }
            RecorderState::AwaitingCompletion | RecorderState::CapturingOutput => {
                if self.detector.is_complete(quiet) {
                    self.finalize_pending();
                    self.set_state(RecorderState::AwaitingPrompt);
                }
            }
            RecorderState::CapturingInput | RecorderState::SessionClosed => {}
        }
    }

    /// The shell process is gone.
    pub fn on_child_exit(&mut self) {
        if self.state == RecorderState::SessionClosed {
            return;
        }

        let deliberate = self
            .pending
            .as_ref()
            .is_some_and(|p| is_exit_command(&p.input));
        if deliberate {
            self.pending = None;
            info!(steps = self.steps.len(), "shell exited on request");
        } else {
            self.finalize_pending();
            warn!(steps = self.steps.len(), "shell exited unexpectedly");
            self.warnings.push(RecorderWarning::Truncated {
                steps_kept: self.steps.len(),
            });
        }
        self.set_state(RecorderState::SessionClosed);
    }

    /// The recorder was told to stop (SIGINT). Only finished steps are kept.
    pub fn on_interrupt(&mut self) {
        if self.state == RecorderState::SessionClosed {
            return;
        }
        let discarded = self.pending.take().map(|p| p.input);
        warn!(?discarded, "recording interrupted");
        self.warnings.push(RecorderWarning::Interrupted { discarded });
        self.set_state(RecorderState::SessionClosed);
    }

    pub fn finish(self) -> RecordOutcome {
        RecordOutcome {
            document: Document {
                description: self.description,
                steps: self.steps,
            },
            warnings: self.warnings,
        }
    }

    fn finalize_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let output = clean_step_output(&pending.raw, &pending.input, &self.prompt);
        info!(input = %pending.input, lines = output.lines().count(), "step recorded");
        self.steps
            .push(Step::Command(CommandStep::new(pending.input, output)));
    }

    fn set_state(&mut self, next: RecorderState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "recorder state");
            self.state = next;
        }
    }
}

fn is_exit_command(input: &str) -> bool {
    let word = input.split_whitespace().next().unwrap_or("");
    word == "exit" || word == "logout"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{prompt_regex, IdleDelay, PromptPattern};
    use std::time::Duration;

    fn recorder() -> SessionRecorder {
        let prompt = prompt_regex("rewind> ").unwrap();
        SessionRecorder::new(Box::new(PromptPattern::new(prompt.clone())), prompt)
    }

    fn at_prompt() -> (SessionRecorder, Instant) {
        let mut rec = recorder();
        let now = Instant::now();
        rec.on_output(b"rewind> ", now);
        rec.on_tick(now);
        assert_eq!(rec.state(), RecorderState::CapturingInput);
        (rec, now)
    }

    fn type_keys(rec: &mut SessionRecorder, keys: &[u8]) -> Vec<Action> {
        let mut out = Vec::new();
        rec.on_key(keys, &mut out);
        out
    }

    fn forwarded(actions: &[Action]) -> Vec<u8> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Forward(b) => Some(b.clone()),
                Action::Close => None,
            })
            .flatten()
            .collect()
    }

    // ====================================================================
    // Step capture
    // ====================================================================

    #[test]
    fn test_single_step_recorded() {
        let (mut rec, now) = at_prompt();
        let actions = type_keys(&mut rec, b"echo hi\r");
        assert_eq!(forwarded(&actions), b"echo hi\r");
        assert_eq!(rec.state(), RecorderState::AwaitingCompletion);

        rec.on_output(b"echo hi\r\n", now);
        assert_eq!(rec.state(), RecorderState::CapturingOutput);
        rec.on_output(b"hi\r\nrewind> ", now);
        rec.on_tick(now);

        // Back at the prompt; the next tick re-arms input capture.
        assert_eq!(rec.state(), RecorderState::AwaitingPrompt);
        rec.on_tick(now);
        assert_eq!(rec.state(), RecorderState::CapturingInput);

        let actions = type_keys(&mut rec, b"\x04");
        assert_eq!(actions, vec![Action::Close]);

        let outcome = rec.finish();
        assert!(outcome.warnings.is_empty());
        assert_eq!(
            outcome.document.steps,
            vec![Step::command("echo hi", "hi")]
        );
    }

    #[test]
    fn test_keystroke_echo_before_enter() {
        let (mut rec, now) = at_prompt();
        // readline echoes every key as it arrives; only CRLF is left for after Enter.
        for key in b"echo hi" {
            type_keys(&mut rec, &[*key]);
            rec.on_output(&[*key], now);
        }
        type_keys(&mut rec, b"\r");
        rec.on_output(b"\r\n", now);
        assert_eq!(rec.state(), RecorderState::CapturingOutput);
        rec.on_output(b"hi\r\nrewind> ", now);
        rec.on_tick(now);

        let doc = rec.finish().document;
        assert_eq!(doc.steps, vec![Step::command("echo hi", "hi")]);
    }

    #[test]
    fn test_line_editing_resolved_before_submit() {
        let (mut rec, now) = at_prompt();
        // Type "ecoh", move left twice, fix the typo in place, then End.
        type_keys(&mut rec, b"ecoh\x1b[D\x1b[D\x7fch\x1b[F hi\r");
        rec.on_output(b"echo hi\r\nhi\r\nrewind> ", now);
        rec.on_tick(now);

        let doc = rec.finish().document;
        assert_eq!(doc.steps[0].as_command().unwrap().input, "echoh hi");
    }

    #[test]
    fn test_empty_enter_stays_in_input() {
        let (mut rec, _) = at_prompt();
        let actions = type_keys(&mut rec, b"\r");
        assert_eq!(forwarded(&actions), b"\r");
        assert_eq!(rec.state(), RecorderState::CapturingInput);
        assert!(rec.steps().is_empty());
    }

    #[test]
    fn test_ctrl_d_ignored_on_non_empty_line() {
        let (mut rec, _) = at_prompt();
        let actions = type_keys(&mut rec, b"ls\x04");
        assert!(!actions.contains(&Action::Close));
        assert_eq!(rec.state(), RecorderState::CapturingInput);
        assert_eq!(rec.line().text(), "ls");
    }

    #[test]
    fn test_unsupported_key_swallowed() {
        let (mut rec, _) = at_prompt();
        // Up arrow: history recall is not reproducible, so it never reaches the shell.
        let actions = type_keys(&mut rec, b"\x1b[A");
        assert!(forwarded(&actions).is_empty());
        assert!(rec.line().is_empty());
    }

    #[test]
    fn test_keys_forwarded_raw_while_running() {
        let (mut rec, _) = at_prompt();
        type_keys(&mut rec, b"cat\r");
        let actions = type_keys(&mut rec, b"\x1b[Aq\x03");
        assert_eq!(forwarded(&actions), b"\x1b[Aq\x03");
        assert!(rec.line().is_empty());
    }

    #[test]
    fn test_idle_detector_completes_on_quiet() {
        let prompt = prompt_regex("rewind> ").unwrap();
        let mut rec = SessionRecorder::new(
            Box::new(IdleDelay::new(Duration::from_millis(100))),
            prompt,
        );
        let start = Instant::now();
        rec.on_output(b"rewind> ", start);
        rec.on_tick(start + Duration::from_millis(10));
        assert_eq!(rec.state(), RecorderState::AwaitingPrompt);
        rec.on_tick(start + Duration::from_millis(150));
        assert_eq!(rec.state(), RecorderState::CapturingInput);
    }

    // ====================================================================
    // Session end
    // ====================================================================

    #[test]
    fn test_exit_command_dropped_silently() {
        let (mut rec, now) = at_prompt();
        type_keys(&mut rec, b"echo a\r");
        rec.on_output(b"echo a\r\na\r\nrewind> ", now);
        rec.on_tick(now);
        rec.on_tick(now);

        type_keys(&mut rec, b"exit\r");
        rec.on_output(b"exit\r\n", now);
        rec.on_child_exit();

        let outcome = rec.finish();
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.document.steps.len(), 1);
    }

    #[test]
    fn test_unexpected_exit_truncates() {
        let (mut rec, now) = at_prompt();
        type_keys(&mut rec, b"kill -9 $$\r");
        rec.on_output(b"kill -9 $$\r\n", now);
        rec.on_child_exit();

        assert_eq!(rec.state(), RecorderState::SessionClosed);
        let outcome = rec.finish();
        assert_eq!(outcome.document.steps.len(), 1);
        assert_eq!(
            outcome.warnings,
            vec![RecorderWarning::Truncated { steps_kept: 1 }]
        );
    }

    #[test]
    fn test_interrupt_discards_step_in_flight() {
        let (mut rec, now) = at_prompt();
        type_keys(&mut rec, b"sleep 100\r");
        rec.on_output(b"sleep 100\r\n", now);
        rec.on_interrupt();

        let outcome = rec.finish();
        assert!(outcome.document.steps.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![RecorderWarning::Interrupted {
                discarded: Some("sleep 100".into())
            }]
        );
    }

    #[test]
    fn test_closed_session_ignores_input() {
        let (mut rec, now) = at_prompt();
        type_keys(&mut rec, b"\x04");
        let actions = type_keys(&mut rec, b"ls\r");
        assert!(actions.is_empty());
        rec.on_output(b"noise", now);
        rec.on_child_exit();
        assert!(rec.finish().warnings.is_empty());
    }
}
