use std::path::Path;

use anyhow::Result;
use rewind_core::compare::render;
use rewind_core::format::parse_artifact;

use super::{prepare, render_options};
use crate::args::ReportArgs;
use crate::router::Workspace;

pub fn run(ws: &Workspace, session: &Path, artifact: &Path, args: &ReportArgs) -> Result<i32> {
    let plan = prepare(ws, session)?;

    let text = std::fs::read_to_string(artifact)
        .map_err(|e| rewind_core::Error::io(artifact, e))?;
    let actual = parse_artifact(&text, artifact).map_err(rewind_core::Error::from)?;

    let report = plan.compare(&actual);
    print!("{}", render(&report, &render_options(args)));
    Ok(report.exit_code())
}
