use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rewind_core::format::serialize_artifact;
use rewind_core::replay::{replay, PtyExecutor, ReplayOutcome};

use super::{artifact_path, prepare, replay_options};
use crate::exit;
use crate::router::Workspace;
use crate::terminal::cancel_on_ctrl_c;

pub async fn run(
    ws: &Workspace,
    session: &Path,
    output: Option<PathBuf>,
    fail_fast: bool,
) -> Result<i32> {
    let plan = prepare(ws, session)?;
    let options = replay_options(ws, fail_fast);
    let cancel = cancel_on_ctrl_c();

    let mut executor = PtyExecutor::spawn(&ws.config, None).map_err(rewind_core::Error::from)?;
    let run = replay(plan.document(), &mut executor, &options, &cancel).await;

    let output = output.unwrap_or_else(|| artifact_path(session));
    std::fs::write(&output, serialize_artifact(&run.actual))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let ran = run
        .actual
        .commands()
        .filter(|s| s.status.is_completed())
        .count();
    eprintln!(
        "Replayed {ran} of {} step(s) into {}",
        plan.document().command_count(),
        output.display()
    );

    Ok(match run.outcome {
        ReplayOutcome::Cancelled { .. } => exit::CANCELLED,
        ReplayOutcome::Stopped { .. } => exit::FAILURE,
        ReplayOutcome::Finished => exit::SUCCESS,
    })
}
