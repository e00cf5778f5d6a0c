//! Raw keystroke decoding.
//!
//! The recorder runs the operator's terminal in raw mode, so it sees the
//! exact bytes each key produces. Only a small editing vocabulary is
//! understood; anything else decodes to `Key::Unsupported`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Left,
    Right,
    /// Ctrl-A, `ESC [ H`, `ESC O H`, `ESC [ 1 ~`, `ESC [ 7 ~`
    Home,
    /// Ctrl-E, `ESC [ F`, `ESC O F`, `ESC [ 4 ~`, `ESC [ 8 ~`
    End,
    Backspace,
    /// `ESC [ 3 ~`
    Delete,
    Enter,
    /// Ctrl-D
    Eof,
    /// Ctrl-C
    Interrupt,
    Unsupported(Vec<u8>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    Ground,
    Esc,
    Csi,
    Ss3,
    Utf8 {
        remaining: usize,
    },
}

/// A decoded key and the bytes it was decoded from.
pub type Keystroke = (Key, Vec<u8>);

#[derive(Debug, Default, Clone)]
pub struct KeyDecoder {
    state: DecodeState,
    pending: Vec<u8>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as many complete keys as `bytes` (plus leftovers) contain.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Keystroke> {
        let mut keys = Vec::new();
        for &b in bytes {
            if let Some(key) = self.step(b) {
                keys.push((key, std::mem::take(&mut self.pending)));
            }
        }
        keys
    }

    /// Give up on a partial sequence (a lone ESC, say).
    pub fn flush(&mut self) -> Option<Keystroke> {
        if self.pending.is_empty() {
            return None;
        }
        self.state = DecodeState::Ground;
        let bytes = std::mem::take(&mut self.pending);
        Some((Key::Unsupported(bytes.clone()), bytes))
    }

    fn step(&mut self, b: u8) -> Option<Key> {
        self.pending.push(b);

        let (next, key) = match self.state {
            DecodeState::Ground => match b {
                0x1b => (DecodeState::Esc, None),
                b'\r' | b'\n' => (DecodeState::Ground, Some(Key::Enter)),
                0x7f | 0x08 => (DecodeState::Ground, Some(Key::Backspace)),
                0x01 => (DecodeState::Ground, Some(Key::Home)),
                0x05 => (DecodeState::Ground, Some(Key::End)),
                0x04 => (DecodeState::Ground, Some(Key::Eof)),
                0x03 => (DecodeState::Ground, Some(Key::Interrupt)),
                0x20..=0x7e => (DecodeState::Ground, Some(Key::Char(b as char))),
                0xc2..=0xdf => (DecodeState::Utf8 { remaining: 1 }, None),
                0xe0..=0xef => (DecodeState::Utf8 { remaining: 2 }, None),
                0xf0..=0xf4 => (DecodeState::Utf8 { remaining: 3 }, None),
                _ => (DecodeState::Ground, Some(self.unsupported())),
            },
            DecodeState::Esc => match b {
                b'[' => (DecodeState::Csi, None),
                b'O' => (DecodeState::Ss3, None),
                _ => (DecodeState::Ground, Some(self.unsupported())),
            },
            DecodeState::Csi => match b {
                0x30..=0x3f => (DecodeState::Csi, None),
                0x40..=0x7e => (DecodeState::Ground, Some(self.csi_key())),
                _ => (DecodeState::Ground, Some(self.unsupported())),
            },
            DecodeState::Ss3 => {
                let key = match b {
                    b'C' => Key::Right,
                    b'D' => Key::Left,
                    b'H' => Key::Home,
                    b'F' => Key::End,
                    _ => self.unsupported(),
                };
                (DecodeState::Ground, Some(key))
            }
            DecodeState::Utf8 { remaining } => {
                if b & 0xc0 != 0x80 {
                    (DecodeState::Ground, Some(self.unsupported()))
                } else if remaining > 1 {
                    (
                        DecodeState::Utf8 {
                            remaining: remaining - 1,
                        },
                        None,
                    )
                } else {
                    let key = std::str::from_utf8(&self.pending)
                        .ok()
                        .and_then(|s| s.chars().next())
                        .map_or_else(|| self.unsupported(), Key::Char);
                    (DecodeState::Ground, Some(key))
                }
            }
        };

        self.state = next;
        key
    }

    fn unsupported(&self) -> Key {
        Key::Unsupported(self.pending.clone())
    }

    /// `pending` holds `ESC [ params final`.
    fn csi_key(&self) -> Key {
        let seq = &self.pending[2..];
        match seq {
            b"C" => Key::Right,
            b"D" => Key::Left,
            b"H" | b"1~" | b"7~" => Key::Home,
            b"F" | b"4~" | b"8~" => Key::End,
            b"3~" => Key::Delete,
            _ => self.unsupported(),
        }
    }
}
