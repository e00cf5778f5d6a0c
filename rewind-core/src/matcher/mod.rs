//! Expected-output matching.
//!
//! Expected text is compiled once into an anchored regex: literal runs
//! are escaped, placeholders become non-capturing groups. Text without
//! placeholders is compared as a plain string instead. Both sides are
//! normalized first (CRLF to LF, trailing whitespace dropped per line,
//! trailing blank lines dropped), so `.` never crosses a newline and
//! `^`/`$` only mean the ends of the whole output.

pub mod diff;
pub mod tokens;

use regex::{Regex, RegexBuilder};

use crate::patterns::PatternRegistry;
pub use diff::{DiffFragment, DiffKind};
use tokens::{scan, Fragment};

/// Compiled-program ceiling for one expected output. Recorded outputs can
/// run to megabytes of literal text around a single placeholder.
const REGEX_SIZE_LIMIT: usize = 256 * (1 << 20);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceholderError {
    #[error("unknown pattern %{{{name}}}")]
    UnknownPattern { name: String },

    #[error("invalid regex `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("{}: step {step}: {source}", file.display())]
    InStep {
        file: std::path::PathBuf,
        step: usize,
        #[source]
        source: Box<PlaceholderError>,
    },
}

impl PlaceholderError {
    pub fn in_step(self, file: impl Into<std::path::PathBuf>, step: usize) -> Self {
        PlaceholderError::InStep {
            file: file.into(),
            step,
            source: Box::new(self),
        }
    }
}

/// One line of expected text, matched on its own for diffing.
#[derive(Debug, Clone)]
pub(crate) enum LineMatcher {
    Pattern(Regex),
    Literal(String),
}

impl LineMatcher {
    pub(crate) fn is_match(&self, line: &str) -> bool {
        match self {
            LineMatcher::Pattern(re) => re.is_match(line),
            LineMatcher::Literal(text) => text == line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    expected: String,
    /// `None` when the expectation has no placeholders.
    whole: Option<Regex>,
    lines: Vec<LineMatcher>,
}

impl CompiledMatcher {
    pub fn compile(expected: &str, registry: &PatternRegistry) -> Result<Self, PlaceholderError> {
        let expected = normalize_output(expected);
        let whole = if has_placeholders(&expected) {
            Some(anchored(&to_regex_source(&expected, registry)?)?)
        } else {
            None
        };

        // Line regexes only drive the diff. A placeholder that spans
        // lines cannot be split, so such lines fall back to literal text.
        let lines = split_lines(&expected)
            .into_iter()
            .map(|line| {
                if whole.is_none() || !has_placeholders(line) {
                    return LineMatcher::Literal(line.to_string());
                }
                to_regex_source(line, registry)
                    .and_then(|src| anchored(&src))
                    .map(LineMatcher::Pattern)
                    .unwrap_or_else(|_| LineMatcher::Literal(line.to_string()))
            })
            .collect();

        Ok(Self {
            expected,
            whole,
            lines,
        })
    }

    /// Expected text as the author wrote it (normalized, placeholders unexpanded).
    pub fn render_expected(&self) -> &str {
        &self.expected
    }

    pub fn matches(&self, actual: &str) -> bool {
        let actual = normalize_output(actual);
        match &self.whole {
            Some(re) => re.is_match(&actual),
            None => actual == self.expected,
        }
    }

    /// Line-level account of where `actual` departs from the expectation.
    pub fn explain(&self, actual: &str) -> Vec<DiffFragment> {
        let actual = normalize_output(actual);
        let expected_lines = split_lines(&self.expected);
        let actual_lines = split_lines(&actual);
        diff::align(&self.lines, &expected_lines, &actual_lines)
    }
}

fn has_placeholders(text: &str) -> bool {
    scan(text)
        .iter()
        .any(|f| !matches!(f, Fragment::Literal(_)))
}

fn anchored(body: &str) -> Result<Regex, PlaceholderError> {
    RegexBuilder::new(&format!(r"\A(?:{body})\z"))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| PlaceholderError::InvalidRegex {
            pattern: body.to_string(),
            message: e.to_string(),
        })
}

fn to_regex_source(text: &str, registry: &PatternRegistry) -> Result<String, PlaceholderError> {
    let mut out = String::with_capacity(text.len() + 16);

    for fragment in scan(text) {
        match fragment {
            Fragment::Literal(s) => out.push_str(&regex::escape(s)),
            Fragment::Named(name) => {
                push_group(&mut out, registry.resolve(name)?);
            }
            Fragment::Inline(src) => {
                Regex::new(src).map_err(|e| PlaceholderError::InvalidRegex {
                    pattern: src.to_string(),
                    message: e.to_string(),
                })?;
                push_group(&mut out, src);
            }
        }
    }

    Ok(out)
}

fn push_group(out: &mut String, src: &str) {
    out.push_str("(?:");
    out.push_str(src);
    out.push(')');
}

/// CRLF to LF, strip trailing whitespace on each line, drop trailing blank lines.
pub fn normalize_output(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("a  \r\nb\t\n\n  \n"), "a\nb");
        assert_eq!(normalize_output("\n\n"), "");
        assert_eq!(normalize_output("\nx"), "\nx");
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let m = CompiledMatcher::compile("a.b (c)*", &PatternRegistry::empty()).unwrap();
        assert!(m.matches("a.b (c)*"));
        assert!(!m.matches("axb (c)*"));
        assert!(!m.matches("a.b cc"));
    }

    #[test]
    fn test_inline_alternation_is_grouped() {
        let m = CompiledMatcher::compile("x#!/a|b/!#y", &PatternRegistry::empty()).unwrap();
        assert!(m.matches("xay"));
        assert!(m.matches("xby"));
        assert!(!m.matches("xa"));
    }

    #[test]
    fn test_dot_does_not_cross_lines() {
        let m = CompiledMatcher::compile("#!/.*/!#", &PatternRegistry::empty()).unwrap();
        assert!(m.matches("one line"));
        assert!(!m.matches("two\nlines"));
    }

    #[test]
    fn test_unknown_named_pattern() {
        let err = CompiledMatcher::compile("%{NOPE}", &PatternRegistry::empty()).unwrap_err();
        assert_eq!(
            err,
            PlaceholderError::UnknownPattern {
                name: "NOPE".into()
            }
        );
        assert_eq!(err.to_string(), "unknown pattern %{NOPE}");
    }

    fn long_listing(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("{i:08} -rw-r--r-- 1 user staff 4096 build/artifact-{i}.o"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_large_literal_output() {
        let expected = long_listing(20_000);
        let m = CompiledMatcher::compile(&expected, &PatternRegistry::empty()).unwrap();
        assert!(m.matches(&format!("{expected}\r\n\n")));
        assert!(!m.matches(&expected.replace("artifact-19999", "artifact-x")));
    }

    #[test]
    fn test_large_output_with_one_placeholder() {
        let body = long_listing(20_000);
        let expected = format!("built in #!/[0-9]+/!#s\n{body}");
        let m = CompiledMatcher::compile(&expected, &PatternRegistry::empty()).unwrap();
        assert!(m.matches(&format!("built in 12s\n{body}")));
        assert!(!m.matches(&format!("built in soon\n{body}")));
    }

    #[test]
    fn test_invalid_inline_regex() {
        let err = CompiledMatcher::compile("#!/(/!#", &PatternRegistry::empty()).unwrap_err();
        assert!(matches!(err, PlaceholderError::InvalidRegex { .. }));
    }
}
