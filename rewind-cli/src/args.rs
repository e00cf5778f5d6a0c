//! CLI argument definitions using clap.
//!
//! - rewind record demo.rec            # record an interactive session
//! - rewind replay demo.rec            # run it again, write demo.rep
//! - rewind compare demo.rec demo.rep  # judge an existing artifact
//! - rewind test demo.rec other.rec    # replay + compare in one go
//! - rewind show demo.rec --flatten    # print the document with blocks inlined
//! - rewind patterns                   # list placeholder patterns

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "rewind")]
#[command(about = "Record, replay and compare interactive terminal sessions")]
#[command(version)]
pub struct Cli {
    /// Project root; `.rewind/config.json` and `.rewind/patterns` are read from here
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Command that starts the target shell, e.g. "docker run -it --rm img bash"
    #[arg(long, global = true)]
    pub shell: Option<String>,

    /// Maximum time a single step may run, in milliseconds
    #[arg(long, global = true)]
    pub step_timeout: Option<u64>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record an interactive session into a new document
    Record {
        /// Where to write the session (`.rec`)
        output: PathBuf,

        /// Free text written above the first step
        #[arg(long, short)]
        description: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Replay a session and write the replay artifact
    Replay {
        session: PathBuf,

        /// Artifact path (defaults to the session path with a `.rep` extension)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Stop at the first step that fails to run or exits non-zero
        #[arg(long)]
        fail_fast: bool,
    },

    /// Compare a session against an existing replay artifact
    Compare {
        session: PathBuf,
        artifact: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Replay sessions and compare the results
    Test {
        #[arg(required = true)]
        sessions: Vec<PathBuf>,

        /// Stop a session at its first step that fails to run or exits non-zero
        #[arg(long)]
        fail_fast: bool,

        /// Keep the replay artifact next to each session
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Print a session document
    Show {
        session: PathBuf,

        /// Inline every referenced block
        #[arg(long)]
        flatten: bool,

        /// Structured JSON instead of the text format
        #[arg(long)]
        json: bool,
    },

    /// List the placeholder patterns in effect
    Patterns {
        /// Exit non-zero if any pattern file has problems
        #[arg(long)]
        check: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Show expected and actual output in two columns
    #[arg(long)]
    pub side_by_side: bool,

    /// Total width of the side-by-side view
    #[arg(long, default_value_t = 160)]
    pub width: usize,

    /// Also list the steps that passed
    #[arg(long)]
    pub all: bool,

    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}
