//! Worker-process side of the process pool.
//!
//! A worker executable reads newline-delimited JSON [`WorkerRequest`]s on stdin
//! and answers each with exactly one [`WorkerReply`] line on stdout. The
//! analyzer is built once, on the first request, and reused for the life of the
//! process. Logs must go to stderr; stdout belongs to the protocol.

use std::borrow::Cow;
use std::io::{BufRead, BufWriter, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PartitionFailure;
use crate::invoke::{AnalyzerFactory, panic_message, run_analyzer};
use crate::types::{PageResult, PartitionOutcome, ProcessingFlags, WorkItem};

/// One partition sent to a worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest<'a> {
    pub index: usize,
    pub items: Cow<'a, [WorkItem]>,
    #[serde(default)]
    pub flags: ProcessingFlags,
}

/// A worker's answer to one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerReply {
    Ok { index: usize, pages: Vec<PageResult> },
    Failed { index: usize, message: String },
}

impl WorkerReply {
    pub fn from_outcome(index: usize, outcome: PartitionOutcome) -> Self {
        match outcome {
            Ok(pages) => WorkerReply::Ok { index, pages },
            Err(failure) => WorkerReply::Failed {
                index,
                message: failure.to_string(),
            },
        }
    }

    pub fn index(&self) -> usize {
        match self {
            WorkerReply::Ok { index, .. } | WorkerReply::Failed { index, .. } => *index,
        }
    }

    /// Convert back into an outcome, checking it answers `expected_index`
    pub fn into_outcome(self, expected_index: usize) -> PartitionOutcome {
        if self.index() != expected_index {
            return Err(PartitionFailure::Inconsistent(format!(
                "worker answered partition {} while {} was in flight",
                self.index(),
                expected_index
            )));
        }

        match self {
            WorkerReply::Ok { pages, .. } => Ok(pages),
            WorkerReply::Failed { message, .. } => Err(PartitionFailure::Remote(message)),
        }
    }
}

/// Serve requests from `reader` until EOF, writing one reply line per request
///
/// Returns the number of requests answered. A request line that is not valid
/// JSON ends the loop with an error: the stream can no longer be trusted.
pub fn serve<F, R, W>(factory: &F, reader: R, mut writer: W) -> Result<usize>
where
    F: AnalyzerFactory,
    R: BufRead,
    W: Write,
{
    let mut analyzer: Option<F::Analyzer> = None;
    let mut served = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read worker request")?;
        if line.trim().is_empty() {
            continue;
        }

        let request: WorkerRequest = serde_json::from_str(&line)
            .with_context(|| format!("Malformed worker request after {served} replies"))?;
        debug!(
            "Worker {} received partition {} ({} pages)",
            std::process::id(),
            request.index,
            request.items.len()
        );

        let outcome = handle_request(factory, &mut analyzer, &request);
        if let Err(failure) = &outcome {
            warn!("Partition {} failed in worker: {}", request.index, failure);
        }

        serde_json::to_writer(&mut writer, &WorkerReply::from_outcome(request.index, outcome))
            .context("Failed to encode worker reply")?;
        writer.write_all(b"\n").context("Failed to write worker reply")?;
        writer.flush().context("Failed to flush worker reply")?;
        served += 1;
    }

    info!("Worker {} exiting after {} partitions", std::process::id(), served);
    Ok(served)
}

/// Serve requests on the process's stdin/stdout
pub fn serve_stdio<F: AnalyzerFactory>(factory: &F) -> Result<usize> {
    let stdin = std::io::stdin().lock();
    let stdout = BufWriter::new(std::io::stdout().lock());
    serve(factory, stdin, stdout)
}

fn handle_request<F: AnalyzerFactory>(
    factory: &F,
    analyzer: &mut Option<F::Analyzer>,
    request: &WorkerRequest,
) -> PartitionOutcome {
    if analyzer.is_none() {
        let created = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| factory.create()));
        match created {
            Ok(Ok(fresh)) => *analyzer = Some(fresh),
            Ok(Err(e)) => {
                return Err(PartitionFailure::Analyzer(format!(
                    "could not create analyzer: {e:#}"
                )));
            }
            Err(payload) => return Err(PartitionFailure::Panicked(panic_message(payload.as_ref()))),
        }
    }

    let Some(current) = analyzer.as_mut() else {
        return Err(PartitionFailure::Analyzer("analyzer unavailable".to_string()));
    };

    let outcome = run_analyzer(current, &request.items, request.flags);
    if matches!(outcome, Err(PartitionFailure::Panicked(_))) {
        // State after a panic is unknown; rebuild on the next request
        *analyzer = None;
    }
    outcome
}
