//! Subcommand implementations. Each returns the process exit code.

pub mod compare;
pub mod patterns;
pub mod record;
pub mod replay;
pub mod show;
pub mod test;

use std::path::{Path, PathBuf};

use rewind_core::compare::{Layout, RenderOptions};
use rewind_core::format::{FsSource, ARTIFACT_EXTENSION};
use rewind_core::{ReplayOptions, TestPlan};

use crate::args::{ColorChoice, ReportArgs};
use crate::router::Workspace;

/// Validate everything about `session` before any command runs.
pub fn prepare(ws: &Workspace, session: &Path) -> rewind_core::Result<TestPlan> {
    TestPlan::prepare(session, &FsSource, ws.registry.clone())
}

pub fn replay_options(ws: &Workspace, fail_fast: bool) -> ReplayOptions {
    ReplayOptions {
        settle: ws.config.settle_policy(),
        fail_fast: fail_fast || ws.config.fail_fast,
    }
}

/// `demo.rec` -> `demo.rep`
pub fn artifact_path(session: &Path) -> PathBuf {
    session.with_extension(ARTIFACT_EXTENSION)
}

pub fn render_options(args: &ReportArgs) -> RenderOptions {
    let mut opts = RenderOptions::from_env();
    match args.color {
        ColorChoice::Always => opts.color = true,
        ColorChoice::Never => opts.color = false,
        ColorChoice::Auto => {}
    }
    if args.side_by_side {
        opts.layout = Layout::SideBySide { width: args.width };
    }
    opts.verbose = args.all;
    opts
}
