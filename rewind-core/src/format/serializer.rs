//! `Document` -> `.rec` text.
//!
//! The output always parses back into an equal document, as long as no
//! section ends in blank lines (the parser drops those).

use super::marker::{self, Marker};
use super::model::{Document, Step};

pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();

    if let Some(description) = &doc.description {
        out.push_str(description);
        out.push('\n');
        if !doc.steps.is_empty() {
            out.push('\n');
        }
    }

    for step in &doc.steps {
        write_step(&mut out, step);
    }

    out
}

pub(crate) fn write_step(out: &mut String, step: &Step) {
    match step {
        Step::Command(cmd) => {
            push_line(out, marker::INPUT);
            push_line(out, &cmd.input);
            push_line(
                out,
                &Marker::Output {
                    checker: cmd.checker.clone(),
                }
                .render(),
            );
            push_body(out, &cmd.expected_output);
        }
        Step::Comment(comment) => {
            push_line(out, marker::COMMENT);
            push_body(out, &comment.text);
        }
        Step::Block(block) => {
            push_line(out, &Marker::Block(block.path.clone()).render());
        }
    }
}

pub(crate) fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

/// Section bodies may be empty; an empty body writes nothing at all.
pub(crate) fn push_body(out: &mut String, body: &str) {
    if !body.is_empty() {
        push_line(out, body);
    }
}
