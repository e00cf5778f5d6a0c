use std::time::Duration;

use async_trait::async_trait;

use crate::format::ExitState;

/// How long to wait, and for what, after submitting a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Minimum time between submitting a step and accepting it as settled.
    pub inter_step_delay: Duration,
    /// Quiet period used by idle-based completion detection and as the
    /// granularity of read timeouts.
    pub idle_timeout: Duration,
    /// Hard cap on one step. Exceeding it records the step as timed out.
    pub step_timeout: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            inter_step_delay: Duration::from_millis(5),
            idle_timeout: Duration::from_millis(500),
            step_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Output attributable to the command, echo and prompt already removed.
    pub output: Vec<u8>,
    pub exit: ExitState,
    pub timed_out: bool,
}

impl ExecOutcome {
    pub fn completed(output: impl Into<Vec<u8>>, exit: ExitState) -> Self {
        Self {
            output: output.into(),
            exit,
            timed_out: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("cannot start target `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("target did not reach its prompt within {0:?}")]
    NotReady(Duration),

    #[error("target exited")]
    TargetExited,

    #[error("target i/o failed: {0}")]
    Io(String),
}

impl ExecError {
    pub(crate) fn io(err: impl std::fmt::Display) -> Self {
        ExecError::Io(err.to_string())
    }
}

/// Runs commands against a target, one at a time.
///
/// `execute` must not return before the command has settled (completed,
/// timed out or failed); the driver relies on this for step ordering.
#[async_trait]
pub trait Executor: Send {
    async fn execute(
        &mut self,
        command: &str,
        policy: &SettlePolicy,
    ) -> Result<ExecOutcome, ExecError>;

    /// Stop the target. Called on cancellation; must be safe to call twice.
    async fn terminate(&mut self);
}
