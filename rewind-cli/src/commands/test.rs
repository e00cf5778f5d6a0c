use std::path::PathBuf;

use anyhow::{Context, Result};
use rewind_core::compare::{render, RunOutcome};
use rewind_core::format::serialize_artifact;
use rewind_core::replay::PtyExecutor;
use rewind_core::run_test;
use tracing::info;

use super::{artifact_path, prepare, render_options, replay_options};
use crate::args::ReportArgs;
use crate::exit;
use crate::router::Workspace;
use crate::terminal::cancel_on_ctrl_c;

pub async fn run(
    ws: &Workspace,
    sessions: &[PathBuf],
    fail_fast: bool,
    save: bool,
    args: &ReportArgs,
) -> Result<i32> {
    // Every document is validated before the first command runs anywhere.
    let plans = sessions
        .iter()
        .map(|path| prepare(ws, path))
        .collect::<rewind_core::Result<Vec<_>>>()?;

    let options = replay_options(ws, fail_fast);
    let render_opts = render_options(args);
    let cancel = cancel_on_ctrl_c();
    let mut code = exit::SUCCESS;

    for (plan, path) in plans.iter().zip(sessions) {
        info!(session = %path.display(), "testing");
        // Fresh shell per session: state never leaks between documents.
        let mut executor =
            PtyExecutor::spawn(&ws.config, None).map_err(rewind_core::Error::from)?;
        let run = run_test(plan, &mut executor, &options, &cancel).await;

        if save {
            let out = artifact_path(path);
            std::fs::write(&out, serialize_artifact(&run.replay.actual))
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }

        if sessions.len() > 1 {
            println!("== {}", path.display());
        }
        print!("{}", render(&run.report, &render_opts));

        match run.report.outcome {
            RunOutcome::Cancelled => return Ok(exit::CANCELLED),
            RunOutcome::Failed => code = exit::FAILURE,
            RunOutcome::Passed => {}
        }
    }

    Ok(code)
}
