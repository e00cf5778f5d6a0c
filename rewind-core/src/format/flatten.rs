//! Block reference expansion.
//!
//! `––– block: <path> –––` is replaced by the steps of
//! `<dir of referencing file>/<path>.recb`, recursively. The chain of
//! files currently being expanded is tracked by their canonical identity
//! (symlinks resolved), so that a file referencing itself, directly or
//! through other blocks, is reported instead of recursing forever.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::{Document, FlattenedDocument, Step};
use super::parser::{parse, ParseError};
use super::source::{normalize_path, DocumentSource};
use super::BLOCK_EXTENSION;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    #[error("{}: block `{reference}` not found at {}", from.display(), resolved.display())]
    Unresolved {
        reference: String,
        from: PathBuf,
        resolved: PathBuf,
    },

    #[error("block reference cycle: {}", Chain(chain))]
    CycleDetected { chain: Vec<PathBuf> },

    #[error(transparent)]
    InvalidBlock(#[from] Box<ParseError>),
}

struct Chain<'a>(&'a [PathBuf]);

/// A file on the expansion stack: the path it was reached by, and what
/// the source says it really is.
struct Visit {
    path: PathBuf,
    key: PathBuf,
}

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", p.display())?;
        }
        Ok(())
    }
}

/// Where a block reference found in `referencing_file` points to.
pub fn resolve_block_path(referencing_file: &Path, reference: &str) -> PathBuf {
    let dir = referencing_file.parent().unwrap_or(Path::new(""));
    let suffix = format!(".{BLOCK_EXTENSION}");
    let file = if reference.ends_with(&suffix) {
        reference.to_string()
    } else {
        format!("{reference}{suffix}")
    };
    normalize_path(&dir.join(file))
}

/// Expand every block reference in `doc`, which was read from `path`.
pub fn flatten(
    doc: &Document,
    path: &Path,
    source: &dyn DocumentSource,
) -> Result<FlattenedDocument, ReferenceError> {
    let root = normalize_path(path);
    let mut chain = vec![Visit {
        path: root.clone(),
        key: source.canonical(&root),
    }];
    let mut steps = Vec::new();
    let mut origins = Vec::new();

    expand(&doc.steps, &root, source, &mut chain, &mut steps, &mut origins)?;

    Ok(FlattenedDocument::new(
        root,
        doc.description.clone(),
        steps,
        origins,
    ))
}

/// Read, parse and flatten the document at `path`.
pub fn load_flattened(
    path: &Path,
    source: &dyn DocumentSource,
) -> Result<FlattenedDocument, crate::Error> {
    let text = source.read(path).map_err(|e| crate::Error::io(path, e))?;
    let doc = parse(&text, path)?;
    Ok(flatten(&doc, path, source)?)
}

fn expand(
    input: &[Step],
    file: &Path,
    source: &dyn DocumentSource,
    chain: &mut Vec<Visit>,
    steps: &mut Vec<Step>,
    origins: &mut Vec<PathBuf>,
) -> Result<(), ReferenceError> {
    for step in input {
        match step {
            Step::Block(block) => {
                let target = resolve_block_path(file, &block.path);
                let key = source.canonical(&target);

                if chain.iter().any(|visit| visit.key == key) {
                    let mut cycle: Vec<PathBuf> = chain.iter().map(|v| v.path.clone()).collect();
                    cycle.push(target);
                    return Err(ReferenceError::CycleDetected { chain: cycle });
                }

                let text = source
                    .read(&target)
                    .map_err(|_| ReferenceError::Unresolved {
                        reference: block.path.clone(),
                        from: file.to_path_buf(),
                        resolved: target.clone(),
                    })?;
                let included = parse(&text, &target).map_err(Box::new)?;

                debug!(block = %target.display(), steps = included.steps.len(), "expanding block");

                chain.push(Visit {
                    path: target.clone(),
                    key,
                });
                expand(&included.steps, &target, source, chain, steps, origins)?;
                chain.pop();
            }
            Step::Command(cmd) => {
                let mut cmd = cmd.clone();
                if let Some(nested) = cmd.nested_steps.take() {
                    let mut nested_steps = Vec::new();
                    let mut nested_origins = Vec::new();
                    expand(&nested, file, source, chain, &mut nested_steps, &mut nested_origins)?;
                    cmd.nested_steps = Some(nested_steps);
                }
                steps.push(Step::Command(cmd));
                origins.push(file.to_path_buf());
            }
            Step::Comment(_) => {
                steps.push(step.clone());
                origins.push(file.to_path_buf());
            }
        }
    }
    Ok(())
}
