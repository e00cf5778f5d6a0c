//! Run configuration (`.rewind/config.json`).
//!
//! Sources, later wins: built-in defaults, the project file, `REWIND_*`
//! environment variables, then whatever the CLI sets explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::{prompt_regex, DetectorKind};
use crate::replay::SettlePolicy;

/// Per-project directory holding `config.json` and `patterns`.
pub const PROJECT_DIR: &str = ".rewind";
pub const CONFIG_FILE: &str = "config.json";
pub const PATTERNS_FILE: &str = "patterns";

/// Shell prompt installed in the target; also what the recorder waits for.
pub const DEFAULT_PROMPT: &str = "rewind> ";

/// Stands for the configured prompt, shell-quoted, inside `shell_init`.
pub const PROMPT_TOKEN: &str = "{prompt}";

/// Typed into the target shell before the first step. Fixes the prompt
/// and makes bash report prompt boundaries and `$?` through OSC 133.
pub const DEFAULT_SHELL_INIT: &str = concat!(
    "unset HISTFILE PROMPT_COMMAND; ",
    "export LANG=C.UTF-8 COLUMNS=1000 TERM=dumb; ",
    "bind 'set enable-bracketed-paste off' 2>/dev/null; ",
    "PROMPT_COMMAND='printf \"\\033]133;D;%s\\007\\033]133;A\\007\" \"$?\"'; ",
    "PS2=''; ",
    "PS1='{prompt}\\[\\033]133;B\\007\\]'",
);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: `{value}`")]
    Env { var: String, value: String },

    #[error("invalid prompt `{prompt}`: {message}")]
    Prompt { prompt: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command that starts the interactive target (default: bash). When
    /// `shell_args` is empty this is split on whitespace, so
    /// `docker run -it --rm alpine sh` works as-is.
    pub shell: String,
    pub shell_args: Vec<String>,
    /// Line typed into the shell once it is up. Empty disables it.
    /// `{prompt}` is replaced by `prompt` (see [`Config::init_line`]).
    pub shell_init: String,
    /// Literal prompt text the shell prints when idle.
    pub prompt: String,
    pub detector: DetectorKind,
    pub inter_step_delay_ms: u64,
    pub idle_timeout_ms: u64,
    pub step_timeout_ms: u64,
    pub fail_fast: bool,
    /// Extra pattern file layered after the project one.
    pub patterns_file: Option<PathBuf>,
    pub cols: u16,
    pub rows: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: "bash".to_string(),
            shell_args: Vec::new(),
            shell_init: DEFAULT_SHELL_INIT.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            detector: DetectorKind::Auto,
            inter_step_delay_ms: 5,
            idle_timeout_ms: 500,
            step_timeout_ms: 30_000,
            fail_fast: false,
            patterns_file: None,
            cols: 1000,
            rows: 50,
        }
    }
}

impl Config {
    /// Defaults, then `<project>/.rewind/config.json` if present, then env.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = project_dir.join(PROJECT_DIR).join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env(std::env::vars())?;
        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Reject settings no session could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Prompt {
            prompt: self.prompt.clone(),
            message: message.to_string(),
        };
        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt must contain visible text"));
        }
        if self.prompt.contains(['\n', '\r']) {
            return Err(invalid("prompt must fit on one line"));
        }
        prompt_regex(&self.prompt).map_err(|e| invalid(&e.to_string()))?;
        Ok(())
    }

    /// `shell_init` with every `{prompt}` replaced by the configured prompt,
    /// escaped for a single-quoted `PS1`.
    pub fn init_line(&self) -> String {
        let quoted = self.prompt.replace('\\', "\\\\").replace('\'', "'\\''");
        self.shell_init.replace(PROMPT_TOKEN, &quoted)
    }

    /// Apply `REWIND_*` overrides from `vars`.
    pub fn apply_env(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (var, value) in vars {
            match var.as_str() {
                "REWIND_SHELL" => self.shell = value,
                "REWIND_PROMPT" => self.prompt = value,
                "REWIND_INTER_STEP_DELAY_MS" => self.inter_step_delay_ms = parse_env(&var, &value)?,
                "REWIND_IDLE_TIMEOUT_MS" => self.idle_timeout_ms = parse_env(&var, &value)?,
                "REWIND_STEP_TIMEOUT_MS" => self.step_timeout_ms = parse_env(&var, &value)?,
                "REWIND_FAIL_FAST" => {
                    self.fail_fast = match value.as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" | "" => false,
                        _ => return Err(ConfigError::Env { var, value }),
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Program and arguments to spawn.
    pub fn shell_command(&self) -> (String, Vec<String>) {
        if !self.shell_args.is_empty() {
            return (self.shell.clone(), self.shell_args.clone());
        }
        let mut words = self.shell.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| "bash".to_string());
        let mut args: Vec<String> = words.collect();
        if args.is_empty() && Path::new(&program).file_name().is_some_and(|n| n == "bash") {
            args = vec!["--noprofile".into(), "--norc".into(), "-i".into()];
        }
        (program, args)
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            inter_step_delay: Duration::from_millis(self.inter_step_delay_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            step_timeout: Duration::from_millis(self.step_timeout_ms),
        }
    }

    /// Pattern files in override order: user-level, project, explicit.
    pub fn pattern_files(&self, project_dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(dir) = user_config_dir() {
            files.push(dir.join(PATTERNS_FILE));
        }
        files.push(project_dir.join(PROJECT_DIR).join(PATTERNS_FILE));
        if let Some(extra) = &self.patterns_file {
            files.push(project_dir.join(extra));
        }
        files
    }
}

/// `~/.config/rewind` on Linux, the platform equivalent elsewhere.
pub fn user_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rewind").map(|dirs| dirs.config_dir().to_path_buf())
}

fn parse_env(var: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.inter_step_delay_ms, 5);
        assert_eq!(c.prompt, DEFAULT_PROMPT);
        assert!(!c.fail_fast);
    }

    #[test]
    fn test_env_overrides() {
        let mut c = Config::default();
        c.apply_env(vars(&[
            ("REWIND_SHELL", "zsh"),
            ("REWIND_STEP_TIMEOUT_MS", "1200"),
            ("REWIND_FAIL_FAST", "true"),
            ("UNRELATED", "x"),
        ]))
        .unwrap();
        assert_eq!(c.shell, "zsh");
        assert_eq!(c.step_timeout_ms, 1200);
        assert!(c.fail_fast);
    }

    #[test]
    fn test_shell_command_splitting() {
        let mut c = Config::default();
        assert_eq!(
            c.shell_command(),
            ("bash".to_string(), vec!["--noprofile".into(), "--norc".into(), "-i".into()])
        );

        c.shell = "docker run -it --rm alpine sh".into();
        let (program, args) = c.shell_command();
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["run", "-it", "--rm", "alpine", "sh"]);
    }

    #[test]
    fn test_init_line_uses_configured_prompt() {
        let mut c = Config::default();
        assert!(c.init_line().contains("PS1='rewind> \\["));

        c.prompt = "it's> ".into();
        let line = c.init_line();
        assert!(line.contains("PS1='it'\\''s> \\["));
        assert!(!line.contains(PROMPT_TOKEN));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let mut c = Config::default();
        c.prompt = "  ".into();
        assert!(matches!(c.validate(), Err(ConfigError::Prompt { .. })));

        c.prompt = "a\nb> ".into();
        assert!(matches!(c.validate(), Err(ConfigError::Prompt { .. })));

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_rejects_blank_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            r#"{"prompt": ""}"#,
        )
        .unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::Prompt { .. })
        ));
    }

    #[test]
    fn test_bad_env_value() {
        let mut c = Config::default();
        let err = c
            .apply_env(vars(&[("REWIND_IDLE_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c: Config = serde_json::from_str(r#"{"shell": "sh", "fail_fast": true}"#).unwrap();
        assert_eq!(c.shell, "sh");
        assert!(c.fail_fast);
        assert_eq!(c.step_timeout_ms, 30_000);
    }

    #[test]
    fn test_load_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            r#"{"cols": 120}"#,
        )
        .unwrap();
        let c = Config::load(dir.path()).unwrap();
        assert_eq!(c.cols, 120);
    }
}
