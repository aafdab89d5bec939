//! Run configuration
//!
//! [`RunConfig`] is fixed for the duration of one `process` call. It is built
//! from compiled defaults, an optional config file (TOML, JSON or YAML) and
//! `PAGE_FANOUT_*` environment variables, in increasing priority.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

use crate::error::{FanoutError, FanoutResult};

pub mod smart_load;

/// Environment variable prefix for run configuration overrides
pub const ENV_PREFIX: &str = "PAGE_FANOUT_";

/// Memory-bound ceiling on default worker count
const DEFAULT_WORKER_CAP: usize = 4;

/// Execution backend used for pooled runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OS threads sharing memory, one analyzer per partition
    #[default]
    Thread,
    /// External worker processes, one analyzer per process
    Process,
}

/// Configuration for one fan-out run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of concurrent execution slots (the pool ceiling)
    pub max_workers: usize,

    /// Pages per thread-pool batch
    pub batch_size: usize,

    /// Thread backend runs at or below this page count skip the pool
    pub single_batch_threshold: usize,

    pub backend: Backend,

    /// Worker executable and arguments, required for the process backend
    pub worker_command: Vec<String>,

    /// Show a progress bar while partitions complete
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            batch_size: 4,
            single_batch_threshold: 6,
            backend: Backend::Thread,
            worker_command: Vec::new(),
            progress: false,
        }
    }
}

fn default_max_workers() -> usize {
    std::cmp::min(num_cpus::get(), DEFAULT_WORKER_CAP).max(1)
}

impl RunConfig {
    /// Layered figment: defaults, then `path` if given, then environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(RunConfig::default()));

        if let Some(path) = path {
            figment = figment.merge(smart_load::auto(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load from defaults and environment only
    pub fn load() -> FanoutResult<Self> {
        Self::load_from(None)
    }

    /// Load with an optional config file and validate the result
    pub fn load_from(path: Option<&Path>) -> FanoutResult<Self> {
        let config: RunConfig = Self::figment(path).extract()?;
        config.validate()?;

        tracing::debug!(
            "Run config: {} workers, batch size {}, backend {:?}",
            config.max_workers,
            config.batch_size,
            config.backend
        );
        Ok(config)
    }

    pub fn validate(&self) -> FanoutResult<()> {
        if self.max_workers == 0 {
            return Err(FanoutError::Config("max_workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(FanoutError::Config("batch_size must be at least 1".into()));
        }
        if self.backend == Backend::Process && self.worker_command.is_empty() {
            return Err(FanoutError::Config(
                "process backend requires a worker_command".into(),
            ));
        }
        if self.worker_command.first().is_some_and(|program| program.is_empty()) {
            return Err(FanoutError::Config("worker_command program is empty".into()));
        }
        Ok(())
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Switch to the process backend running `command`
    pub fn with_worker_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend = Backend::Process;
        self.worker_command = command.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests;
