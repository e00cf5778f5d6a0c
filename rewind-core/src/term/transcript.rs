//! Raw step bytes -> comparable output text.

use regex::Regex;

use super::sanitize::sanitize;

/// Strip terminal noise from everything the PTY produced for one command.
///
/// The shell echoes the typed command before running it and redraws the
/// prompt afterwards; neither belongs to the command's output. Leading
/// lines ending in the command's own lines are treated as echo, and
/// trailing lines matching `prompt` (or blank) are dropped.
///
/// When the command was typed key by key, most of the echo arrived before
/// Enter and `raw` opens with only the tail of the line (often nothing)
/// followed by the line break. That first line is echo too.
pub fn clean_step_output(raw: &[u8], input: &str, prompt: &Regex) -> String {
    let text = sanitize(raw);
    let mut lines: Vec<&str> = text.split('\n').collect();

    let mut skip = 0;
    for command_line in input.lines().map(str::trim_end) {
        if command_line.is_empty() {
            continue;
        }
        match lines.get(skip) {
            Some(line) if line.trim_end().ends_with(command_line) => skip += 1,
            Some(line) if skip == 0 && lines.len() > 1 && is_echo_tail(line, command_line) => {
                skip += 1;
                break;
            }
            _ => break,
        }
    }
    lines.drain(..skip);

    while let Some(last) = lines.last() {
        if last.trim().is_empty() || prompt.is_match(last) {
            lines.pop();
        } else {
            break;
        }
    }

    lines.join("\n")
}

/// `line` is what is left of the echo of `command_line` once the typed
/// prefix has already been shown.
fn is_echo_tail(line: &str, command_line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || command_line.ends_with(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Regex {
        Regex::new(r"^rewind> ?\s*$").unwrap()
    }

    #[test]
    fn test_echo_and_prompt_removed() {
        let raw = b"echo hi\r\nhi\r\nrewind> ";
        assert_eq!(clean_step_output(raw, "echo hi", &prompt()), "hi");
    }

    #[test]
    fn test_leftover_prompt_before_echo() {
        let raw = b"rewind> echo hi\r\nhi\r\nrewind> ";
        assert_eq!(clean_step_output(raw, "echo hi", &prompt()), "hi");
    }

    #[test]
    fn test_no_output() {
        let raw = b"true\r\n\x1b]133;D;0\x07rewind> ";
        assert_eq!(clean_step_output(raw, "true", &prompt()), "");
    }

    #[test]
    fn test_echo_sent_before_enter() {
        // Per-keystroke echo already went out; only CRLF follows Enter.
        let raw = b"\r\nhi\r\n\x1b]133;D;0\x07rewind> ";
        assert_eq!(clean_step_output(raw, "echo hi", &prompt()), "hi");
    }

    #[test]
    fn test_late_echo_tail_before_enter() {
        let raw = b"hi\r\nhi\r\nrewind> ";
        assert_eq!(clean_step_output(raw, "echo hi", &prompt()), "hi");
    }

    #[test]
    fn test_leading_blank_output_kept_after_echo_break() {
        let raw = b"\r\n\r\nhi\r\nrewind> ";
        assert_eq!(clean_step_output(raw, "echo; echo hi", &prompt()), "\nhi");
    }

    #[test]
    fn test_multiline_input_echo() {
        let raw = b"for i in 1 2; do\r\necho $i; done\r\n1\r\n2\r\nrewind> ";
        assert_eq!(
            clean_step_output(raw, "for i in 1 2; do\necho $i; done", &prompt()),
            "1\n2"
        );
    }
}
