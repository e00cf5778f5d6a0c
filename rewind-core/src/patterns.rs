//! Named placeholder patterns.
//!
//! Expected output may say `%{SEMVER}` instead of `1.4.2`. The names
//! resolve through a `PatternRegistry`, built once per run by layering
//! pattern files on top of each other:
//!
//! 1. the built-in set compiled into the binary
//! 2. the user-level file (`<config dir>/rewind/patterns`)
//! 3. the project file (`.rewind/patterns`)
//!
//! A later layer replaces an earlier definition of the same name. Bad
//! lines never abort loading; they come back as `PatternWarning`s.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::matcher::PlaceholderError;

const BUILTIN: &str = include_str!("patterns.default");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternOrigin {
    Builtin,
    File(std::path::PathBuf),
}

impl fmt::Display for PatternOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternOrigin::Builtin => f.write_str("<builtin>"),
            PatternOrigin::File(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningReason {
    InvalidIdentifier(String),
    MissingRegex(String),
    InvalidRegex { name: String, message: String },
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternWarning {
    pub origin: PatternOrigin,
    /// 1-based; 0 when the whole file is affected.
    pub line: usize,
    pub reason: WarningReason,
}

impl fmt::Display for PatternWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: ", self.origin, self.line)?;
        match &self.reason {
            WarningReason::InvalidIdentifier(name) => {
                write!(f, "`{name}` is not a valid pattern name")
            }
            WarningReason::MissingRegex(name) => write!(f, "pattern `{name}` has no regex"),
            WarningReason::InvalidRegex { name, message } => {
                write!(f, "pattern `{name}` does not compile: {message}")
            }
            WarningReason::Unreadable(message) => write!(f, "cannot read pattern file: {message}"),
        }
    }
}

/// Ordered name -> regex-source mapping. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PatternRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in set alone.
    pub fn builtin() -> Self {
        let (registry, warnings) = Self::empty().layer(BUILTIN, PatternOrigin::Builtin);
        debug_assert!(warnings.is_empty(), "built-in patterns must be clean");
        registry
    }

    /// Built-ins overridden by `project` text.
    pub fn load(project: &str, origin: PatternOrigin) -> (Self, Vec<PatternWarning>) {
        Self::builtin().layer(project, origin)
    }

    /// Built-ins plus every existing file in `files`, in order.
    ///
    /// Missing files are skipped silently; unreadable ones become warnings.
    pub fn discover<'a>(
        files: impl IntoIterator<Item = &'a Path>,
    ) -> (Self, Vec<PatternWarning>) {
        let mut registry = Self::builtin();
        let mut warnings = Vec::new();

        for path in files {
            let origin = PatternOrigin::File(path.to_path_buf());
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let (next, mut w) = registry.layer(&text, origin);
                    registry = next;
                    warnings.append(&mut w);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "no pattern file");
                }
                Err(e) => warnings.push(PatternWarning {
                    origin,
                    line: 0,
                    reason: WarningReason::Unreadable(e.to_string()),
                }),
            }
        }

        for w in &warnings {
            warn!("{w}");
        }
        (registry, warnings)
    }

    /// Apply one pattern file on top of this registry.
    pub fn layer(mut self, text: &str, origin: PatternOrigin) -> (Self, Vec<PatternWarning>) {
        let mut warnings = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (name, regex) = match line.split_once(char::is_whitespace) {
                Some((name, rest)) => (name, rest.trim()),
                None => (line, ""),
            };

            let reason = if !is_identifier(name) {
                Some(WarningReason::InvalidIdentifier(name.to_string()))
            } else if regex.is_empty() {
                Some(WarningReason::MissingRegex(name.to_string()))
            } else if let Err(e) = Regex::new(regex) {
                Some(WarningReason::InvalidRegex {
                    name: name.to_string(),
                    message: e.to_string(),
                })
            } else {
                None
            };

            match reason {
                Some(reason) => warnings.push(PatternWarning {
                    origin: origin.clone(),
                    line: idx + 1,
                    reason,
                }),
                None => self.define(name, regex),
            }
        }

        (self, warnings)
    }

    fn define(&mut self, name: &str, regex: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].1 = regex.to_string(),
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), regex.to_string()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&i| self.entries[i].1.as_str())
    }

    pub fn resolve(&self, name: &str) -> Result<&str, PlaceholderError> {
        self.get(name).ok_or_else(|| PlaceholderError::UnknownPattern {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `[A-Z][A-Z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_set_is_clean() {
        let (_, warnings) = PatternRegistry::empty().layer(BUILTIN, PatternOrigin::Builtin);
        assert!(warnings.is_empty(), "{warnings:?}");
        let reg = PatternRegistry::builtin();
        assert_eq!(reg.get("SEMVER"), Some(r"[0-9]+\.[0-9]+\.[0-9]+"));
        assert!(reg.get("IPADDR").is_some());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("A"));
        assert!(is_identifier("HTTP_2"));
        assert!(!is_identifier("lower"));
        assert!(!is_identifier("2X"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("A-B"));
    }
}
