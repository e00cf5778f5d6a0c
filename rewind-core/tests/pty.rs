// rewind-core/tests/pty.rs
//
// Record and replay against a real bash in a pseudo-terminal: keystroke
// echo, shell state carried between steps, exit codes, cancellation, and
// a recorded session replaying cleanly against itself.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rewind_core::compare::RunOutcome;
use rewind_core::format::{flatten, parse, serialize, Document, ExitState, MapSource, Step};
use rewind_core::replay::{PtyExecutor, ReplayOutcome};
use rewind_core::{
    record, run_test, Config, FlattenedDocument, PatternRegistry, RecordOutcome, RecorderWarning,
    ReplayOptions, TestPlan,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const PROMPT: &str = "rewind> ";
const WAIT: Duration = Duration::from_secs(10);

fn bash_available() -> bool {
    std::process::Command::new("bash")
        .args(["-c", "true"])
        .status()
        .is_ok_and(|s| s.success())
}

fn config() -> Config {
    Config {
        shell: "bash".into(),
        ..Config::default()
    }
}

fn options(config: &Config) -> ReplayOptions {
    ReplayOptions {
        settle: config.settle_policy(),
        fail_fast: false,
    }
}

fn plan(doc: &Document) -> TestPlan {
    let path = Path::new("/t/session.rec");
    let doc = parse(&serialize(doc), path).unwrap();
    let flat: FlattenedDocument = flatten(&doc, path, &MapSource::new()).unwrap();
    TestPlan::from_flattened(flat, Arc::new(PatternRegistry::builtin())).unwrap()
}

/// Everything the recorder showed the operator.
#[derive(Clone, Default)]
struct Screen(Arc<Mutex<Vec<u8>>>);

impl Screen {
    fn prompts(&self) -> usize {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .matches(PROMPT)
            .count()
    }

    async fn wait_for_prompts(&self, n: usize) {
        let started = Instant::now();
        while self.prompts() < n {
            assert!(started.elapsed() < WAIT, "prompt #{n} never appeared");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Write for Screen {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Type `text` one key at a time, the way a person would.
async fn type_slowly(keys: &mpsc::Sender<Vec<u8>>, text: &str) {
    for b in text.bytes() {
        keys.send(vec![b]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
}

async fn record_typing(config: &Config, commands: &[&str]) -> RecordOutcome {
    let screen = Screen::default();
    let mut display = screen.clone();
    let (keys, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();

    let typist = async move {
        screen.wait_for_prompts(1).await;
        for (i, command) in commands.iter().enumerate() {
            type_slowly(&keys, command).await;
            keys.send(b"\r".to_vec()).await.unwrap();
            screen.wait_for_prompts(i + 2).await;
            // Give the recorder a few ticks to settle the step.
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        keys.send(vec![0x04]).await.unwrap();
    };

    let (outcome, ()) = tokio::join!(record(config, None, rx, &mut display, &cancel), typist);
    outcome.unwrap()
}

// ============================================================================
// Recording
// ============================================================================

#[tokio::test]
async fn test_recorded_session_replays_against_itself() {
    if !bash_available() {
        eprintln!("bash not found; skipping");
        return;
    }
    let config = config();

    let outcome = record_typing(&config, &["echo hi", "printf 'a\\n\\nb\\n'"]).await;
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(
        outcome.document.steps,
        vec![
            Step::command("echo hi", "hi"),
            Step::command("printf 'a\\n\\nb\\n'", "a\n\nb"),
        ]
    );

    let plan = plan(&outcome.document);
    let mut exec = PtyExecutor::spawn(&config, None).unwrap();
    let run = run_test(&plan, &mut exec, &options(&config), &CancellationToken::new()).await;

    assert_eq!(run.replay.outcome, ReplayOutcome::Finished);
    assert_eq!(run.report.outcome, RunOutcome::Passed, "{:?}", run.report);
}

#[tokio::test]
async fn test_recording_cancelled_mid_command() {
    if !bash_available() {
        eprintln!("bash not found; skipping");
        return;
    }
    let config = config();
    let screen = Screen::default();
    let mut display = screen.clone();
    let (keys, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let typist = async move {
        screen.wait_for_prompts(1).await;
        type_slowly(&keys, "sleep 30").await;
        keys.send(b"\r".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
        // Hold the keyboard open until the recorder has stopped.
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(keys);
    };

    let started = Instant::now();
    let (outcome, ()) = tokio::join!(record(&config, None, rx, &mut display, &cancel), typist);
    let outcome = outcome.unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(outcome.document.steps.is_empty());
    assert_eq!(
        outcome.warnings,
        vec![RecorderWarning::Interrupted {
            discarded: Some("sleep 30".into())
        }]
    );
}

// ============================================================================
// Replay
// ============================================================================

#[tokio::test]
async fn test_shell_state_carries_between_steps() {
    if !bash_available() {
        eprintln!("bash not found; skipping");
        return;
    }
    let config = config();
    let doc = Document::new(vec![
        Step::command("cd /tmp", ""),
        Step::command("pwd", "/tmp"),
        Step::command("GREETING=hello", ""),
        Step::command("echo $GREETING", "hello"),
    ]);

    let mut exec = PtyExecutor::spawn(&config, None).unwrap();
    let run = run_test(&plan(&doc), &mut exec, &options(&config), &CancellationToken::new()).await;

    assert_eq!(run.report.outcome, RunOutcome::Passed, "{:?}", run.report);
}

#[tokio::test]
async fn test_exit_codes_reported_through_shell_integration() {
    if !bash_available() {
        eprintln!("bash not found; skipping");
        return;
    }
    let config = config();
    let doc = Document::new(vec![
        Step::command("true", ""),
        Step::command("false", ""),
        Step::command("(exit 7)", ""),
    ]);

    let mut exec = PtyExecutor::spawn(&config, None).unwrap();
    let run = run_test(&plan(&doc), &mut exec, &options(&config), &CancellationToken::new()).await;

    let exits: Vec<ExitState> = run.replay.actual.commands().map(|s| s.exit).collect();
    assert_eq!(
        exits,
        vec![ExitState::Code(0), ExitState::Code(1), ExitState::Code(7)]
    );
}

#[tokio::test]
async fn test_replay_cancelled_during_long_step() {
    if !bash_available() {
        eprintln!("bash not found; skipping");
        return;
    }
    let config = config();
    let doc = Document::new(vec![
        Step::command("sleep 30", ""),
        Step::command("echo after", "after"),
    ]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        trigger.cancel();
    });

    let mut exec = PtyExecutor::spawn(&config, None).unwrap();
    let started = Instant::now();
    let run = run_test(&plan(&doc), &mut exec, &options(&config), &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(run.replay.outcome, ReplayOutcome::Cancelled { at_step: 0 });
    assert_eq!(run.report.exit_code(), 130);
}
