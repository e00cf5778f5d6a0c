/// Escape-sequence stripper for captured output.
///
/// Keeps printable text and newlines. Drops:
/// - CSI sequences (colors, cursor movement, erase)
/// - OSC / DCS / PM / APC strings (BEL or ST terminated)
/// - BEL, NUL and other C0 controls except tab
/// - everything drawn while the alternate screen is active (?47 / ?1047 / ?1049)
///
/// A bare CR followed by more text discards the current line, which keeps
/// the final state of progress-bar style redraws. Backspace erases the
/// previous character.
#[derive(Debug, Default, Clone)]
pub struct Sanitizer {
    state: ParseState,
    params: Vec<u8>,
    alt_screen: bool,
    pending_cr: bool,
    line: Vec<u8>,
    out: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ParseState {
    #[default]
    Ground,
    Esc,
    Csi,
    Str,
    StrEsc,
    Charset,
}

/// One-shot convenience over `Sanitizer`.
pub fn sanitize(bytes: &[u8]) -> String {
    let mut s = Sanitizer::new();
    s.feed(bytes);
    s.finish()
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = match self.state {
                ParseState::Ground => self.ground(b),
                ParseState::Esc => match b {
                    b'[' => {
                        self.params.clear();
                        ParseState::Csi
                    }
                    b']' | b'P' | b'X' | b'^' | b'_' => ParseState::Str,
                    b'(' | b')' | b'*' | b'+' => ParseState::Charset,
                    _ => ParseState::Ground,
                },
                ParseState::Csi => match b {
                    0x20..=0x3f => {
                        self.params.push(b);
                        ParseState::Csi
                    }
                    0x40..=0x7e => {
                        self.csi_final(b);
                        ParseState::Ground
                    }
                    0x1b => ParseState::Esc,
                    _ => ParseState::Csi,
                },
                ParseState::Str => match b {
                    0x07 => ParseState::Ground,
                    0x1b => ParseState::StrEsc,
                    _ => ParseState::Str,
                },
                ParseState::StrEsc => match b {
                    b'\\' => ParseState::Ground,
                    _ => ParseState::Str,
                },
                ParseState::Charset => ParseState::Ground,
            };
        }
    }

    pub fn finish(mut self) -> String {
        self.out.append(&mut self.line);
        String::from_utf8_lossy(&self.out).into_owned()
    }

    fn ground(&mut self, b: u8) -> ParseState {
        if b == 0x1b {
            return ParseState::Esc;
        }
        if self.alt_screen {
            return ParseState::Ground;
        }

        match b {
            b'\r' => self.pending_cr = true,
            b'\n' => {
                self.pending_cr = false;
                self.out.append(&mut self.line);
                self.out.push(b'\n');
            }
            0x08 => {
                // drop one whole UTF-8 char
                while let Some(last) = self.line.pop() {
                    if last & 0xc0 != 0x80 {
                        break;
                    }
                }
            }
            b'\t' => self.push_text(b),
            0x00..=0x1f | 0x7f => {}
            _ => self.push_text(b),
        }
        ParseState::Ground
    }

    fn push_text(&mut self, b: u8) {
        if self.pending_cr {
            self.pending_cr = false;
            self.line.clear();
        }
        self.line.push(b);
    }

    fn csi_final(&mut self, fin: u8) {
        let Some(private) = self.params.strip_prefix(b"?") else {
            return;
        };
        if fin != b'h' && fin != b'l' {
            return;
        }
        let alt = private
            .split(|&c| c == b';')
            .any(|m| matches!(m, b"47" | b"1047" | b"1049"));
        if alt {
            self.alt_screen = fin == b'h';
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_colors_and_osc() {
        assert_eq!(
            sanitize(b"\x1b[1;31mred\x1b[0m \x1b]0;title\x07ok\r\n"),
            "red ok\n"
        );
    }

    #[test]
    fn test_carriage_return_redraw() {
        assert_eq!(sanitize(b"10%\r50%\r100%\r\ndone"), "100%\ndone");
    }

    #[test]
    fn test_backspace() {
        assert_eq!(sanitize(b"ab\x08c"), "ac");
        assert_eq!(sanitize("é\x08x".as_bytes()), "x");
    }

    #[test]
    fn test_alt_screen_content_dropped() {
        assert_eq!(
            sanitize(b"before\n\x1b[?1049hFULLSCREEN\n\x1b[?1049lafter"),
            "before\nafter"
        );
    }

    #[test]
    fn test_nul_and_bel_dropped() {
        assert_eq!(sanitize(b"a\x00b\x07c"), "abc");
    }
}
