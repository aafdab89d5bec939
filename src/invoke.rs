//! Worker invocation contract.
//!
//! The actual page analysis is an external collaborator. It is reached only
//! through [`PageAnalyzer`] (the stateful resource, e.g. a loaded model) and
//! [`AnalyzerFactory`] (how to build a fresh one). Analyzers are never shared
//! between concurrent execution contexts: the thread backend builds one per
//! partition, a worker process builds one for its lifetime.

use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;

use crate::error::PartitionFailure;
use crate::types::{PageResult, Partition, PartitionOutcome, ProcessingFlags, WorkItem};

/// Stateful page analysis resource
pub trait PageAnalyzer {
    /// Analyze an ordered batch of pages, returning page results in order
    fn analyze(&mut self, items: &[WorkItem], flags: ProcessingFlags) -> Result<Vec<PageResult>>;
}

/// Builds fresh analyzers for each execution context
pub trait AnalyzerFactory: Send + Sync {
    type Analyzer: PageAnalyzer;

    fn create(&self) -> Result<Self::Analyzer>;
}

impl<F, A> AnalyzerFactory for F
where
    F: Fn() -> Result<A> + Send + Sync,
    A: PageAnalyzer,
{
    type Analyzer = A;

    fn create(&self) -> Result<A> {
        self()
    }
}

/// Run one batch against an existing analyzer, turning errors and panics into failures
pub fn run_analyzer<A: PageAnalyzer>(
    analyzer: &mut A,
    items: &[WorkItem],
    flags: ProcessingFlags,
) -> PartitionOutcome {
    match catch_unwind(AssertUnwindSafe(|| analyzer.analyze(items, flags))) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(PartitionFailure::Analyzer(format!("{e:#}"))),
        Err(payload) => Err(PartitionFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Invoke one partition with a freshly built analyzer
pub fn invoke_partition<F: AnalyzerFactory + ?Sized>(
    factory: &F,
    partition: &Partition,
) -> PartitionOutcome {
    let mut analyzer = match catch_unwind(AssertUnwindSafe(|| factory.create())) {
        Ok(Ok(analyzer)) => analyzer,
        Ok(Err(e)) => {
            return Err(PartitionFailure::Analyzer(format!(
                "could not create analyzer: {e:#}"
            )));
        }
        Err(payload) => return Err(PartitionFailure::Panicked(panic_message(payload.as_ref()))),
    };

    run_analyzer(&mut analyzer, &partition.items, partition.flags)
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
