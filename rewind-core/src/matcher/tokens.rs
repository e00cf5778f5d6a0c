//! Splits expected text into literal runs and placeholders.
//!
//! - `%{NAME}` is a named placeholder when `NAME` is a valid identifier.
//! - `#!/regex/!#` is an inline placeholder.
//!
//! Anything that only looks like the start of a placeholder (`%{lower}`,
//! an unterminated `#!/`) stays literal text.

use crate::patterns::is_identifier;

pub const NAMED_OPEN: &str = "%{";
pub const NAMED_CLOSE: char = '}';
pub const INLINE_OPEN: &str = "#!/";
pub const INLINE_CLOSE: &str = "/!#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    Literal(&'a str),
    Named(&'a str),
    Inline(&'a str),
}

pub fn scan(text: &str) -> Vec<Fragment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        let token = if let Some(after) = rest.strip_prefix(NAMED_OPEN) {
            after
                .find(NAMED_CLOSE)
                .map(|end| &after[..end])
                .filter(|name| is_identifier(name))
                .map(|name| (Fragment::Named(name), NAMED_OPEN.len() + name.len() + 1))
        } else if let Some(after) = rest.strip_prefix(INLINE_OPEN) {
            after.find(INLINE_CLOSE).map(|end| {
                (
                    Fragment::Inline(&after[..end]),
                    INLINE_OPEN.len() + end + INLINE_CLOSE.len(),
                )
            })
        } else {
            None
        };

        match token {
            Some((fragment, consumed)) => {
                if literal_start < i {
                    out.push(Fragment::Literal(&text[literal_start..i]));
                }
                out.push(fragment);
                i += consumed;
                literal_start = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if literal_start < text.len() {
        out.push(Fragment::Literal(&text[literal_start..]));
    }
    out
}
