//! Live recording loop: operator keyboard <-> recorder <-> PTY shell.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::machine::{Action, RecordOutcome, RecorderState, SessionRecorder};
use crate::config::Config;
use crate::detect::{build_detector, prompt_regex};
use crate::pty_manager::{PtyManager, SpawnSpec};

/// Completion and escape-sequence flushing are re-evaluated at this rate.
const TICK: Duration = Duration::from_millis(20);
/// A lone ESC older than this is a key press, not the start of a sequence.
const ESCAPE_GRACE: Duration = Duration::from_millis(50);
const STARTUP_QUIET: Duration = Duration::from_millis(200);

/// Record one interactive session.
///
/// `keys` carries raw operator keystrokes; `display` receives everything the
/// operator should see. Cancelling `cancel` stops the recording, keeping
/// only steps that had already completed.
pub async fn record(
    config: &Config,
    cwd: Option<&Path>,
    mut keys: mpsc::Receiver<Vec<u8>>,
    display: &mut (dyn Write + Send),
    cancel: &CancellationToken,
) -> Result<RecordOutcome> {
    let (program, args) = config.shell_command();
    let mut pty = PtyManager::spawn(&SpawnSpec {
        program: &program,
        args: &args,
        cwd,
        env: &[("TERM", "dumb"), ("PS1", config.prompt.as_str())],
        cols: config.cols,
        rows: config.rows,
    })?;
    let mut output = pty.start_reader()?;

    let idle = Duration::from_millis(config.idle_timeout_ms);
    let detector = build_detector(config.detector, &config.prompt, idle)
        .with_context(|| format!("invalid prompt `{}`", config.prompt))?;
    let prompt = prompt_regex(&config.prompt)
        .with_context(|| format!("invalid prompt `{}`", config.prompt))?;
    let mut recorder = SessionRecorder::new(detector, prompt);

    if !wait_for_quiet(&mut output, Duration::from_millis(config.step_timeout_ms)).await {
        recorder.on_child_exit();
        return Ok(recorder.finish());
    }
    if !config.shell_init.is_empty() {
        pty.write_line(&config.init_line())?;
    } else {
        pty.write_line("")?;
    }
    info!(%program, "recording started");

    let mut tick = tokio::time::interval(TICK);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut actions = Vec::new();
    // Shell output stays hidden until the first real prompt, so the
    // operator never sees the integration line being installed.
    let mut visible = false;
    let mut last_key = Instant::now();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                recorder.on_interrupt();
            }
            chunk = output.recv() => match chunk {
                Some(bytes) => {
                    recorder.on_output(&bytes, Instant::now());
                    if visible {
                        display.write_all(&bytes).context("Failed to write to display")?;
                        display.flush().context("Failed to flush display")?;
                    }
                }
                None => recorder.on_child_exit(),
            },
            key = keys.recv() => match key {
                Some(bytes) => {
                    last_key = Instant::now();
                    recorder.on_key(&bytes, &mut actions);
                }
                None => {
                    debug!("keyboard closed");
                    recorder.on_interrupt();
                }
            },
            _ = tick.tick() => {
                if last_key.elapsed() >= ESCAPE_GRACE {
                    recorder.flush_keys(&mut actions);
                }
                recorder.on_tick(Instant::now());
                if !visible && recorder.state() == RecorderState::CapturingInput {
                    visible = true;
                    display
                        .write_all(config.prompt.as_bytes())
                        .context("Failed to write to display")?;
                    display.flush().context("Failed to flush display")?;
                }
            }
        }

        for action in actions.drain(..) {
            match action {
                Action::Forward(bytes) => pty.write_raw(&bytes)?,
                Action::Close => debug!("close requested"),
            }
        }

        if recorder.state() == RecorderState::SessionClosed {
            break;
        }
    }

    if let Err(e) = pty.kill() {
        debug!(error = %e, "kill failed");
    }
    let outcome = recorder.finish();
    info!(
        steps = outcome.document.steps.len(),
        warnings = outcome.warnings.len(),
        "recording finished"
    );
    Ok(outcome)
}

/// Drain startup output until the shell has been silent for a moment.
/// Returns `false` if the shell exited first.
async fn wait_for_quiet(output: &mut mpsc::Receiver<Vec<u8>>, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        match tokio::time::timeout(STARTUP_QUIET.min(remaining), output.recv()).await {
            Ok(Some(chunk)) => debug!(bytes = chunk.len(), "startup output"),
            Ok(None) => return false,
            Err(_) => return true,
        }
    }
}
