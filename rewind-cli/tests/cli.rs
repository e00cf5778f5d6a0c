// rewind-cli/tests/cli.rs
//
// Argument parsing, exit-code mapping and the non-interactive commands.

use std::path::{Path, PathBuf};

use clap::Parser;
use rewind_cli::router::Workspace;
use rewind_cli::{commands, exit, Cli, ColorChoice, Commands};
use tempfile::tempdir;

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn test_parse_test_command() {
    let cli = Cli::try_parse_from([
        "rewind",
        "test",
        "a.rec",
        "b.rec",
        "--fail-fast",
        "--side-by-side",
        "--color",
        "never",
    ])
    .unwrap();

    match cli.command {
        Commands::Test {
            sessions,
            fail_fast,
            save,
            report,
        } => {
            assert_eq!(sessions, vec![PathBuf::from("a.rec"), PathBuf::from("b.rec")]);
            assert!(fail_fast);
            assert!(!save);
            assert!(report.side_by_side);
            assert_eq!(report.color, ColorChoice::Never);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_test_requires_a_session() {
    assert!(Cli::try_parse_from(["rewind", "test"]).is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "rewind",
        "replay",
        "demo.rec",
        "--shell",
        "sh -i",
        "--project",
        "/tmp/p",
        "-v",
    ])
    .unwrap();
    assert_eq!(cli.shell.as_deref(), Some("sh -i"));
    assert_eq!(cli.project, PathBuf::from("/tmp/p"));
    assert!(cli.verbose);
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn test_structural_errors_exit_2() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.rec");
    std::fs::write(&path, "––– output –––\nno input\n").unwrap();

    let err = commands::show::run(&path, false, false).unwrap_err();
    assert_eq!(exit::for_error(&err), exit::STRUCTURAL);
}

#[test]
fn test_missing_block_exit_2() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("main.rec");
    std::fs::write(&path, "––– block: nowhere –––\n").unwrap();

    let err = commands::show::run(&path, true, false).unwrap_err();
    assert_eq!(exit::for_error(&err), exit::STRUCTURAL);
}

#[test]
fn test_missing_file_exit_3() {
    let err = commands::show::run(Path::new("/nonexistent/x.rec"), false, false).unwrap_err();
    assert_eq!(exit::for_error(&err), exit::SETUP);
}

#[test]
fn test_plain_anyhow_error_is_setup() {
    let err = anyhow::anyhow!("no terminal");
    assert_eq!(exit::for_error(&err), exit::SETUP);
}

#[test]
fn test_context_does_not_hide_kind() {
    use anyhow::Context;
    let parse: anyhow::Result<()> = Err(rewind_core::format::parse(
        "––– nonsense –––\n",
        Path::new("x.rec"),
    )
    .unwrap_err()
    .into());
    let err = parse.context("while loading").unwrap_err();
    assert_eq!(exit::for_error(&err), exit::STRUCTURAL);
}

// ============================================================================
// Workspace
// ============================================================================

#[test]
fn test_workspace_layers_project_patterns() {
    let dir = tempdir().unwrap();
    let rewind_dir = dir.path().join(".rewind");
    std::fs::create_dir(&rewind_dir).unwrap();
    std::fs::write(rewind_dir.join("patterns"), "BUILD [0-9]{4}\nbad-name x\n").unwrap();
    std::fs::write(rewind_dir.join("config.json"), r#"{ "step_timeout_ms": 1234 }"#).unwrap();

    let cli = Cli::try_parse_from([
        "rewind",
        "--project",
        dir.path().to_str().unwrap(),
        "--shell",
        "zsh",
        "patterns",
    ])
    .unwrap();
    let ws = Workspace::load(&cli).unwrap();

    assert_eq!(ws.registry.get("BUILD"), Some("[0-9]{4}"));
    assert!(ws.registry.get("SEMVER").is_some());
    assert_eq!(ws.pattern_warnings.len(), 1);
    assert_eq!(ws.config.shell, "zsh");
    assert_eq!(ws.config.step_timeout_ms, 1234);

    assert_eq!(commands::patterns::run(&ws, true).unwrap(), exit::FAILURE);
    assert_eq!(commands::patterns::run(&ws, false).unwrap(), exit::SUCCESS);
}

#[test]
fn test_compare_against_artifact() {
    let dir = tempdir().unwrap();
    let session = dir.path().join("demo.rec");
    let artifact = dir.path().join("demo.rep");
    std::fs::write(&session, "––– input –––\necho hi\n––– output –––\nhi\n").unwrap();
    std::fs::write(
        &artifact,
        "––– input –––\necho hi\n––– output –––\nhi\n––– duration: 3ms (100.00%) –––\n––– exit: 0 –––\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from(["rewind", "--project", dir.path().to_str().unwrap(), "patterns"])
        .unwrap();
    let ws = Workspace::load(&cli).unwrap();
    let args = rewind_cli::ReportArgs {
        side_by_side: false,
        width: 80,
        all: false,
        color: ColorChoice::Never,
    };
    assert_eq!(
        commands::compare::run(&ws, &session, &artifact, &args).unwrap(),
        exit::SUCCESS
    );

    std::fs::write(
        &artifact,
        "––– input –––\necho hi\n––– output –––\nhi there\n––– duration: 3ms (100.00%) –––\n",
    )
    .unwrap();
    assert_eq!(
        commands::compare::run(&ws, &session, &artifact, &args).unwrap(),
        exit::FAILURE
    );
}
