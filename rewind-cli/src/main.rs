use std::process::ExitCode;

use clap::Parser;
use rewind_cli::{exit, router, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match router::route(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit::for_error(&e)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(exit::FAILURE as u8))
}

/// Logs go to stderr so reports on stdout stay clean. `RUST_LOG` wins
/// unless `--verbose` asks for debug output explicitly.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
