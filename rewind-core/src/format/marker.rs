//! Separator lines.
//!
//! Every section of a session file starts with a marker line of the form
//! `––– <name> –––` (three U+2013 en dashes on each side). Lines that do
//! not have that shape are content, whatever they contain.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

pub const DASHES: &str = "–––";
pub const INPUT: &str = "––– input –––";
pub const OUTPUT: &str = "––– output –––";
pub const COMMENT: &str = "––– comment –––";

static BLOCK_PATH: OnceLock<Regex> = OnceLock::new();
static DURATION: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Input,
    Output { checker: Option<String> },
    Comment,
    Block(String),

    // Replay metadata. Only `.rep` files carry these; session parsing skips them.
    Duration { elapsed: Duration, share: Option<f64> },
    Exit(i32),
    Status(String),
}

impl Marker {
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Marker::Duration { .. } | Marker::Exit(_) | Marker::Status(_)
        )
    }

    pub fn render(&self) -> String {
        match self {
            Marker::Input => INPUT.to_string(),
            Marker::Output { checker: None } => OUTPUT.to_string(),
            Marker::Output {
                checker: Some(name),
            } => wrap(&format!("output: {name}")),
            Marker::Comment => COMMENT.to_string(),
            Marker::Block(path) => wrap(&format!("block: {path}")),
            Marker::Duration {
                elapsed,
                share: Some(share),
            } => wrap(&format!("duration: {}ms ({share:.2}%)", elapsed.as_millis())),
            Marker::Duration {
                elapsed,
                share: None,
            } => wrap(&format!("duration: {}ms", elapsed.as_millis())),
            Marker::Exit(code) => wrap(&format!("exit: {code}")),
            Marker::Status(label) => wrap(&format!("status: {label}")),
        }
    }
}

/// Why a marker-shaped line could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    Unknown(String),
    MalformedBlock(String),
}

fn wrap(inner: &str) -> String {
    format!("{DASHES} {inner} {DASHES}")
}

/// Classify one line.
///
/// `None` means the line is ordinary content.
pub fn classify(line: &str) -> Option<Result<Marker, MarkerError>> {
    let inner = line
        .trim_end()
        .strip_prefix("––– ")?
        .strip_suffix(" –––")?
        .trim();

    Some(classify_inner(inner))
}

fn classify_inner(inner: &str) -> Result<Marker, MarkerError> {
    match inner {
        "input" => return Ok(Marker::Input),
        "output" => return Ok(Marker::Output { checker: None }),
        "comment" => return Ok(Marker::Comment),
        _ => {}
    }

    if let Some(name) = inner.strip_prefix("output:") {
        let name = name.trim();
        if name.is_empty() {
            return Err(MarkerError::Unknown(inner.to_string()));
        }
        return Ok(Marker::Output {
            checker: Some(name.to_string()),
        });
    }

    if let Some(path) = inner.strip_prefix("block:") {
        let path = path.trim();
        let re = BLOCK_PATH.get_or_init(|| {
            Regex::new(r"^[.a-zA-Z0-9\-/_]+$").expect("block path regex is valid")
        });
        if !re.is_match(path) {
            return Err(MarkerError::MalformedBlock(path.to_string()));
        }
        return Ok(Marker::Block(path.to_string()));
    }

    if inner.starts_with("duration:") {
        let re = DURATION.get_or_init(|| {
            Regex::new(r"^duration:\s*(\d+)ms(?:\s*\((\d+(?:\.\d+)?)%\))?$")
                .expect("duration regex is valid")
        });
        let caps = re
            .captures(inner)
            .ok_or_else(|| MarkerError::Unknown(inner.to_string()))?;
        let millis = caps[1]
            .parse::<u64>()
            .map_err(|_| MarkerError::Unknown(inner.to_string()))?;
        let share = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        return Ok(Marker::Duration {
            elapsed: Duration::from_millis(millis),
            share,
        });
    }

    if let Some(code) = inner.strip_prefix("exit:") {
        return code
            .trim()
            .parse::<i32>()
            .map(Marker::Exit)
            .map_err(|_| MarkerError::Unknown(inner.to_string()));
    }

    if let Some(label) = inner.strip_prefix("status:") {
        return Ok(Marker::Status(label.trim().to_string()));
    }

    Err(MarkerError::Unknown(inner.to_string()))
}
