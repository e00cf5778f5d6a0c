//! Command routing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use rewind_core::{Config, PatternRegistry};
use rewind_core::patterns::PatternWarning;

use crate::args::{Cli, Commands};
use crate::commands;

/// Configuration and patterns shared by every command.
#[derive(Debug)]
pub struct Workspace {
    pub project: PathBuf,
    pub config: Config,
    pub registry: Arc<PatternRegistry>,
    pub pattern_warnings: Vec<PatternWarning>,
}

impl Workspace {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(&cli.project).map_err(rewind_core::Error::from)?;
        if let Some(shell) = &cli.shell {
            config.shell = shell.clone();
            config.shell_args.clear();
        }
        if let Some(ms) = cli.step_timeout {
            config.step_timeout_ms = ms;
        }

        let files = config.pattern_files(&cli.project);
        let (registry, pattern_warnings) =
            PatternRegistry::discover(files.iter().map(PathBuf::as_path));

        Ok(Self {
            project: cli.project.clone(),
            config,
            registry: Arc::new(registry),
            pattern_warnings,
        })
    }
}

/// Run the selected command and return its exit code.
pub async fn route(cli: Cli) -> Result<i32> {
    let ws = Workspace::load(&cli)?;

    match cli.command {
        Commands::Record {
            output,
            description,
            force,
        } => commands::record::run(&ws, &output, description, force).await,
        Commands::Replay {
            session,
            output,
            fail_fast,
        } => commands::replay::run(&ws, &session, output, fail_fast).await,
        Commands::Compare {
            session,
            artifact,
            report,
        } => commands::compare::run(&ws, &session, &artifact, &report),
        Commands::Test {
            sessions,
            fail_fast,
            save,
            report,
        } => commands::test::run(&ws, &sessions, fail_fast, save, &report).await,
        Commands::Show {
            session,
            flatten,
            json,
        } => commands::show::run(&session, flatten, json),
        Commands::Patterns { check } => commands::patterns::run(&ws, check),
    }
}
