//! Error taxonomy for fan-out runs.
//!
//! Only [`FanoutError`] ever reaches the caller of `process`. A
//! [`PartitionFailure`] is absorbed by the aggregator: it is logged, the
//! partition contributes an empty result and the run carries on.

use thiserror::Error;

/// Fatal errors that abort a run before any partial result exists
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The executor pool itself could not be built
    #[error("failed to set up {backend} pool with {workers} workers: {reason}")]
    PoolSetup {
        backend: &'static str,
        workers: usize,
        reason: String,
    },

    #[error("invalid run configuration: {0}")]
    Config(String),

    #[error("failed to load run configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for FanoutError {
    fn from(err: figment::Error) -> Self {
        FanoutError::Load(Box::new(err))
    }
}

/// Why a single partition produced no results
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionFailure {
    /// The analyzer could not be built or returned an error
    #[error("analyzer failed: {0}")]
    Analyzer(String),

    #[error("analyzer panicked: {0}")]
    Panicked(String),

    /// The worker process answered with a failure of its own
    #[error("worker reported failure: {0}")]
    Remote(String),

    /// No worker process could be started for this partition
    #[error("worker process unavailable: {0}")]
    Spawn(String),

    /// The worker process went away before answering
    #[error("worker process exited before replying")]
    WorkerExited,

    /// The worker answered with something that is not a valid reply
    #[error("worker protocol error: {0}")]
    Protocol(String),

    /// A completion arrived for an out-of-range or already-completed index
    #[error("inconsistent completion: {0}")]
    Inconsistent(String),
}

pub type FanoutResult<T> = std::result::Result<T, FanoutError>;
