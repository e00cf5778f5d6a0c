use std::io::IsTerminal;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rewind_core::format::serialize;
use rewind_core::recorder::record;
use rewind_core::RecorderWarning;

use crate::exit;
use crate::router::Workspace;
use crate::terminal::{cancel_on_ctrl_c, spawn_key_reader, RawModeGuard};

pub async fn run(
    ws: &Workspace,
    output: &Path,
    description: Option<String>,
    force: bool,
) -> Result<i32> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    if !std::io::stdin().is_terminal() {
        bail!("recording needs an interactive terminal on stdin");
    }

    eprintln!(
        "Recording to {}. Press Ctrl-D on an empty prompt to finish.",
        output.display()
    );

    let cancel = cancel_on_ctrl_c();
    let outcome = {
        let _raw = RawModeGuard::enable()?;
        let keys = spawn_key_reader();
        let mut stdout = std::io::stdout();
        record(&ws.config, None, keys, &mut stdout, &cancel).await?
    };

    let mut document = outcome.document;
    if description.is_some() {
        document.description = description;
    }

    let interrupted = outcome
        .warnings
        .iter()
        .any(|w| matches!(w, RecorderWarning::Interrupted { .. }));
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }

    std::fs::write(output, serialize(&document))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!(
        "Recorded {} step(s) to {}",
        document.commands().count(),
        output.display()
    );

    Ok(if interrupted {
        exit::CANCELLED
    } else {
        exit::SUCCESS
    })
}
