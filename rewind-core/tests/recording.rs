// rewind-core/tests/recording.rs
//
// Drives the recorder state machine through whole sessions and checks the
// documents it produces survive a trip through the text format.

use std::path::Path;
use std::time::{Duration, Instant};

use rewind_core::detect::{prompt_regex, AutoDetector};
use rewind_core::format::{parse, serialize, Step};
use rewind_core::recorder::{Action, RecorderState, RecorderWarning, SessionRecorder};

fn recorder() -> SessionRecorder {
    let prompt = prompt_regex("rewind> ").unwrap();
    SessionRecorder::new(Box::new(AutoDetector::new(prompt.clone())), prompt)
}

/// Type `keys`, let the shell answer with `reply`, and wait for the prompt.
fn step(rec: &mut SessionRecorder, keys: &[u8], reply: &[u8], now: Instant) -> Vec<u8> {
    let mut actions = Vec::new();
    rec.on_key(keys, &mut actions);
    rec.on_output(reply, now);
    rec.on_tick(now + Duration::from_millis(20));
    rec.on_tick(now + Duration::from_millis(40));
    actions
        .into_iter()
        .filter_map(|a| match a {
            Action::Forward(bytes) => Some(bytes),
            Action::Close => None,
        })
        .flatten()
        .collect()
}

// ============================================================================
// Whole sessions
// ============================================================================

#[test]
fn test_session_with_shell_integration() {
    let mut rec = recorder().with_description("Greets twice.");
    let now = Instant::now();

    // First prompt, drawn with OSC 133 markers.
    rec.on_output(b"\x1b]133;A\x07rewind> \x1b]133;B\x07", now);
    rec.on_tick(now);
    assert_eq!(rec.state(), RecorderState::CapturingInput);

    let sent = step(
        &mut rec,
        b"echo hello\r",
        b"echo hello\r\nhello\r\n\x1b]133;D;0\x07\x1b]133;A\x07rewind> \x1b]133;B\x07",
        now,
    );
    assert_eq!(sent, b"echo hello\r");

    step(
        &mut rec,
        b"printf 'a\\n\\nb\\n'\r",
        b"printf 'a\\n\\nb\\n'\r\na\r\n\r\nb\r\n\x1b]133;D;0\x07\x1b]133;A\x07rewind> \x1b]133;B\x07",
        now,
    );

    let mut actions = Vec::new();
    rec.on_key(b"\x04", &mut actions);
    assert_eq!(actions, vec![Action::Close]);

    let outcome = rec.finish();
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome.document.steps,
        vec![
            Step::command("echo hello", "hello"),
            Step::command("printf 'a\\n\\nb\\n'", "a\n\nb"),
        ]
    );

    let text = serialize(&outcome.document);
    assert_eq!(parse(&text, Path::new("r.rec")).unwrap(), outcome.document);
}

#[test]
fn test_multi_chunk_output_and_utf8_keys() {
    let mut rec = recorder();
    let now = Instant::now();
    rec.on_output(b"rewind> ", now);
    rec.on_tick(now);

    let mut actions = Vec::new();
    // "echo é" with the two UTF-8 bytes split across reads.
    rec.on_key(b"echo \xc3", &mut actions);
    rec.on_key(b"\xa9\r", &mut actions);
    assert_eq!(rec.state(), RecorderState::AwaitingCompletion);

    rec.on_output("echo é\r\n".as_bytes(), now);
    rec.on_tick(now);
    assert_eq!(rec.state(), RecorderState::CapturingOutput);
    rec.on_output("é\r\nrew".as_bytes(), now);
    rec.on_tick(now);
    assert_eq!(rec.state(), RecorderState::CapturingOutput);
    rec.on_output(b"ind> ", now);
    rec.on_tick(now);

    let doc = rec.finish().document;
    assert_eq!(doc.steps, vec![Step::command("echo é", "é")]);
}

#[test]
fn test_truncated_session_keeps_completed_steps() {
    let mut rec = recorder();
    let now = Instant::now();
    rec.on_output(b"rewind> ", now);
    rec.on_tick(now);

    step(&mut rec, b"echo one\r", b"echo one\r\none\r\nrewind> ", now);
    let mut actions = Vec::new();
    rec.on_key(b"kill -KILL $$\r", &mut actions);
    rec.on_child_exit();

    let outcome = rec.finish();
    assert_eq!(outcome.document.steps.len(), 2);
    assert_eq!(
        outcome.warnings,
        vec![RecorderWarning::Truncated { steps_kept: 2 }]
    );
}
