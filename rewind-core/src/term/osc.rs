use std::borrow::Cow;

/// Shell-integration events (FinalTerm / OSC 133), chunk-safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscEvent {
    /// OSC 133;A  prompt is about to be drawn
    PromptStart,

    /// OSC 133;B  prompt fully drawn, shell is reading input
    PromptEnd,

    /// OSC 133;C  command accepted and running
    CommandExecuted,

    /// OSC 133;D;<exit>
    CommandFinished { exit_code: Option<i32> },

    /// Any other OSC payload, without its terminator.
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Scan {
    #[default]
    Text,
    TextEsc,
    Payload,
    PayloadEsc,
}

/// Streaming OSC parser. Terminators: BEL or ST (`ESC \`).
///
/// Sequences split across `feed` calls are reassembled.
#[derive(Debug, Default, Clone)]
pub struct OscParser {
    scan: Scan,
    payload: Vec<u8>,
}

impl OscParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<OscEvent> {
        let mut events = Vec::new();

        for &b in bytes {
            self.scan = match (self.scan, b) {
                (Scan::Text, 0x1b) => Scan::TextEsc,
                (Scan::TextEsc, b']') => {
                    self.payload.clear();
                    Scan::Payload
                }
                (Scan::Text, _) => Scan::Text,
                (Scan::TextEsc, 0x1b) => Scan::TextEsc,
                (Scan::TextEsc, _) => Scan::Text,

                (Scan::Payload, 0x07) => {
                    events.extend(self.finish());
                    Scan::Text
                }
                (Scan::Payload, 0x1b) => Scan::PayloadEsc,
                (Scan::Payload, _) => {
                    self.payload.push(b);
                    Scan::Payload
                }
                (Scan::PayloadEsc, b'\\') => {
                    events.extend(self.finish());
                    Scan::Text
                }
                (Scan::PayloadEsc, _) => {
                    self.payload.extend_from_slice(&[0x1b, b]);
                    Scan::Payload
                }
            };
        }

        events
    }

    fn finish(&mut self) -> Option<OscEvent> {
        if self.payload.is_empty() {
            return None;
        }
        let event = parse_payload(String::from_utf8_lossy(&self.payload));
        self.payload.clear();
        Some(event)
    }
}

fn parse_payload(payload: Cow<'_, str>) -> OscEvent {
    let s = payload.trim_matches('\0').trim();

    let Some(rest) = s.strip_prefix("133;") else {
        return OscEvent::Other(s.to_string());
    };

    match rest.as_bytes().first() {
        Some(b'A') => OscEvent::PromptStart,
        Some(b'B') => OscEvent::PromptEnd,
        Some(b'C') => OscEvent::CommandExecuted,
        Some(b'D') => OscEvent::CommandFinished {
            exit_code: rest.split(';').nth(1).and_then(|x| x.trim().parse().ok()),
        },
        _ => OscEvent::Other(s.to_string()),
    }
}
