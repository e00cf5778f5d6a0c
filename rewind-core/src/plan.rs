//! Validated test plans.
//!
//! Everything that can be wrong with a document (syntax, missing blocks,
//! cycles, unknown placeholders, bad regexes) is found here, before a
//! single command reaches the target.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compare::{compare_with_matchers, compile_matchers, ComparisonReport};
use crate::error::Result;
use crate::format::{load_flattened, ActualDocument, DocumentSource, FlattenedDocument};
use crate::matcher::{CompiledMatcher, PlaceholderError};
use crate::patterns::PatternRegistry;
use crate::replay::{replay, Executor, ReplayOptions, ReplayRun};

#[derive(Debug, Clone)]
pub struct TestPlan {
    document: FlattenedDocument,
    matchers: Vec<Option<CompiledMatcher>>,
    registry: Arc<PatternRegistry>,
}

/// Replay results together with their verdicts.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub replay: ReplayRun,
    pub report: ComparisonReport,
}

impl TestPlan {
    /// Read, parse, flatten and compile the session at `path`.
    pub fn prepare(
        path: &Path,
        source: &dyn DocumentSource,
        registry: Arc<PatternRegistry>,
    ) -> Result<Self> {
        let document = load_flattened(path, source)?;
        Ok(Self::from_flattened(document, registry)?)
    }

    pub fn from_flattened(
        document: FlattenedDocument,
        registry: Arc<PatternRegistry>,
    ) -> Result<Self, PlaceholderError> {
        let matchers = compile_matchers(&document, &registry)?;
        info!(
            source = %document.source().display(),
            commands = document.command_count(),
            "test plan ready"
        );
        Ok(Self {
            document,
            matchers,
            registry,
        })
    }

    pub fn document(&self) -> &FlattenedDocument {
        &self.document
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn compare(&self, actual: &ActualDocument) -> ComparisonReport {
        compare_with_matchers(&self.document, &self.matchers, actual)
    }
}

/// Replay the plan's document and judge the results.
pub async fn run_test(
    plan: &TestPlan,
    executor: &mut dyn Executor,
    options: &ReplayOptions,
    cancel: &CancellationToken,
) -> TestRun {
    let run = replay(&plan.document, executor, options, cancel).await;
    let report = plan.compare(&run.actual);
    TestRun {
        replay: run,
        report,
    }
}
