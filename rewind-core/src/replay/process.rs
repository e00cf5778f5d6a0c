//! One-shot executor.
//!
//! Each step runs as `sh -c <input>` in a fresh process with stderr merged
//! into stdout. Nothing carries over between steps (no `cd`, no shell
//! variables), so this suits stateless documents and environments where
//! a PTY is not available.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use super::executor::{ExecError, ExecOutcome, Executor, SettlePolicy};
use crate::format::ExitState;

#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    shell: String,
    cwd: Option<PathBuf>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ProcessExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(
        &mut self,
        command: &str,
        policy: &SettlePolicy,
    ) -> Result<ExecOutcome, ExecError> {
        info!("executing: {}", command.trim());

        // `exec 2>&1` keeps stdout and stderr interleaved in one stream.
        let script = format!("exec 2>&1\n{command}");
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            program: self.shell.clone(),
            message: e.to_string(),
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Io("child stdout not captured".into()))?;

        // Read in chunks so a timeout still reports what was printed so far.
        let mut output = Vec::new();
        let run = async {
            let mut chunk = [0u8; 4096];
            loop {
                let n = stdout.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                output.extend_from_slice(&chunk[..n]);
            }
            child.wait().await
        };

        match tokio::time::timeout(policy.step_timeout, run).await {
            Ok(Ok(status)) => {
                debug!(code = ?status.code(), bytes = output.len(), "process finished");
                Ok(ExecOutcome::completed(output, status.code().into()))
            }
            Ok(Err(e)) => Err(ExecError::io(e)),
            Err(_) => {
                debug!(bytes = output.len(), "process timed out");
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "kill failed");
                }
                Ok(ExecOutcome {
                    output,
                    exit: ExitState::Unknown,
                    timed_out: true,
                })
            }
        }
    }

    async fn terminate(&mut self) {
        // kill_on_drop: dropping the cancelled execute future already killed the child.
        debug!("process executor terminated");
    }
}
