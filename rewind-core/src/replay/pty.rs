//! Interactive-shell executor.
//!
//! Keeps one shell alive for the whole document, so `cd`, variables and
//! functions carry over from step to step exactly as they did while
//! recording.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::executor::{ExecError, ExecOutcome, Executor, SettlePolicy};
use crate::config::Config;
use crate::detect::{build_detector, prompt_regex, CompletionDetector};
use crate::format::ExitState;
use crate::pty_manager::{PtyManager, SpawnSpec};
use crate::term::clean_step_output;

/// How long the freshly spawned shell may stay silent before the init line is sent anyway.
const STARTUP_QUIET: Duration = Duration::from_millis(200);

pub struct PtyExecutor {
    pty: PtyManager,
    output: mpsc::Receiver<Vec<u8>>,
    detector: Box<dyn CompletionDetector>,
    prompt: Regex,
    shell_init: String,
    ready: bool,
    exited: bool,
}

impl std::fmt::Debug for PtyExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyExecutor")
            .field("pty", &self.pty)
            .field("detector", &self.detector)
            .field("ready", &self.ready)
            .field("exited", &self.exited)
            .finish()
    }
}

/// Bytes read for one step, and whether the step ran out of time.
struct Collected {
    raw: Vec<u8>,
    timed_out: bool,
    eof: bool,
}

impl PtyExecutor {
    /// Spawn the configured target. The shell is initialized lazily on the first step.
    pub fn spawn(config: &Config, cwd: Option<PathBuf>) -> Result<Self, ExecError> {
        let (program, args) = config.shell_command();
        let spawn_err = |e: anyhow::Error| ExecError::Spawn {
            program: program.clone(),
            message: format!("{e:#}"),
        };

        let mut pty = PtyManager::spawn(&SpawnSpec {
            program: &program,
            args: &args,
            cwd: cwd.as_deref(),
            env: &[("TERM", "dumb"), ("PS1", config.prompt.as_str())],
            cols: config.cols,
            rows: config.rows,
        })
        .map_err(spawn_err)?;
        let output = pty.start_reader().map_err(spawn_err)?;

        let idle = Duration::from_millis(config.idle_timeout_ms);
        let detector = build_detector(config.detector, &config.prompt, idle).map_err(|e| {
            ExecError::Spawn {
                program: program.clone(),
                message: format!("invalid prompt: {e}"),
            }
        })?;
        let prompt = prompt_regex(&config.prompt).map_err(|e| ExecError::Spawn {
            program: program.clone(),
            message: format!("invalid prompt: {e}"),
        })?;

        info!(%program, ?args, "target started");

        Ok(Self {
            pty,
            output,
            detector,
            prompt,
            shell_init: config.init_line(),
            ready: false,
            exited: false,
        })
    }

    /// Wait for the first prompt, install the shell integration and wait again.
    async fn initialize(&mut self, policy: &SettlePolicy) -> Result<(), ExecError> {
        let deadline = Instant::now() + policy.step_timeout;

        // Let the shell print its banner and first prompt.
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExecError::NotReady(policy.step_timeout));
            }
            match tokio::time::timeout(STARTUP_QUIET.min(remaining), self.output.recv()).await {
                Ok(Some(chunk)) => debug!(bytes = chunk.len(), "startup output"),
                Ok(None) => {
                    self.exited = true;
                    return Err(ExecError::TargetExited);
                }
                Err(_) => break,
            }
        }

        self.detector.reset();
        if !self.shell_init.is_empty() {
            let init = self.shell_init.clone();
            self.pty.write_line(&init).map_err(ExecError::io)?;
        } else {
            // Nudge the shell into redrawing its prompt.
            self.pty.write_line("").map_err(ExecError::io)?;
        }

        let collected = self.collect(policy).await?;
        if collected.eof {
            self.exited = true;
            return Err(ExecError::TargetExited);
        }
        if collected.timed_out {
            return Err(ExecError::NotReady(policy.step_timeout));
        }

        self.ready = true;
        debug!("target ready");
        Ok(())
    }

    /// Read until the detector reports the prompt, or the step times out.
    async fn collect(&mut self, policy: &SettlePolicy) -> Result<Collected, ExecError> {
        let started = Instant::now();
        let mut last_output = Instant::now();
        let mut raw = Vec::new();
        let tick = policy.idle_timeout.max(Duration::from_millis(10));

        loop {
            let elapsed = started.elapsed();
            if elapsed >= policy.step_timeout {
                return Ok(Collected {
                    raw,
                    timed_out: true,
                    eof: false,
                });
            }

            let wait = tick.min(policy.step_timeout - elapsed);
            match tokio::time::timeout(wait, self.output.recv()).await {
                Ok(Some(chunk)) => {
                    self.detector.observe(&chunk);
                    raw.extend_from_slice(&chunk);
                    last_output = Instant::now();
                }
                Ok(None) => {
                    return Ok(Collected {
                        raw,
                        timed_out: false,
                        eof: true,
                    })
                }
                Err(_) => {}
            }

            if started.elapsed() >= policy.inter_step_delay
                && self.detector.is_complete(last_output.elapsed())
            {
                return Ok(Collected {
                    raw,
                    timed_out: false,
                    eof: false,
                });
            }
        }
    }

    /// Ctrl-C the foreground command and wait briefly for the prompt.
    async fn interrupt(&mut self, policy: &SettlePolicy) {
        if self.pty.write_raw(&[0x03]).is_err() {
            return;
        }
        self.detector.reset();
        let short = SettlePolicy {
            step_timeout: policy.idle_timeout.max(Duration::from_millis(100)) * 4,
            ..policy.clone()
        };
        if let Ok(c) = self.collect(&short).await {
            self.exited |= c.eof;
        }
    }
}

#[async_trait]
impl Executor for PtyExecutor {
    async fn execute(
        &mut self,
        command: &str,
        policy: &SettlePolicy,
    ) -> Result<ExecOutcome, ExecError> {
        if self.exited {
            return Err(ExecError::TargetExited);
        }
        if !self.ready {
            self.initialize(policy).await?;
        }

        self.detector.reset();
        for line in command.lines() {
            self.pty.write_line(line).map_err(ExecError::io)?;
        }

        let collected = self.collect(policy).await?;
        if collected.eof {
            self.exited = true;
        }
        if collected.timed_out {
            warn!(command, "no prompt before step timeout; interrupting");
            self.interrupt(policy).await;
        }

        let exit = if collected.timed_out {
            ExitState::Unknown
        } else {
            self.detector.exit_code().into()
        };
        let output = clean_step_output(&collected.raw, command, &self.prompt);

        Ok(ExecOutcome {
            output: output.into_bytes(),
            exit,
            timed_out: collected.timed_out,
        })
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.pty.kill() {
            debug!(error = %e, "kill failed");
        }
        self.exited = true;
    }
}
