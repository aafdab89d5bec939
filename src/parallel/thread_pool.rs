use parking_lot::Mutex;
use tracing::debug;

use crate::error::{FanoutError, FanoutResult};
use crate::invoke::{AnalyzerFactory, invoke_partition};
use crate::types::Partition;

use super::aggregate::CompletionMap;
use super::progress::PartitionProgress;

/// Bounded pool of OS threads scoped to one run
///
/// Every partition gets its own analyzer from the factory, so no analyzer
/// state is ever shared between threads. The only shared mutable state is the
/// completion accumulator, guarded by a mutex around each append.
pub struct ThreadPoolExecutor {
    pool: rayon::ThreadPool,
    max_workers: usize,
}

impl ThreadPoolExecutor {
    pub fn new(max_workers: usize) -> FanoutResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|worker_id| format!("page-fanout-{worker_id}"))
            .build()
            .map_err(|e| FanoutError::PoolSetup {
                backend: "thread",
                workers: max_workers,
                reason: e.to_string(),
            })?;

        Ok(Self { pool, max_workers })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Submit every partition at once and block until all have completed
    pub fn execute<F>(
        &self,
        partitions: Vec<Partition>,
        factory: &F,
        progress: &PartitionProgress,
    ) -> CompletionMap
    where
        F: AnalyzerFactory,
    {
        let completions = Mutex::new(CompletionMap::new(partitions.len()));

        self.pool.scope(|s| {
            for partition in partitions {
                let completions = &completions;
                s.spawn(move |_| {
                    debug!(
                        "Thread batch {} started ({} pages) on {}",
                        partition.index,
                        partition.len(),
                        std::thread::current().name().unwrap_or("worker")
                    );

                    let outcome = invoke_partition(factory, &partition);
                    progress.partition_done(outcome.as_ref().ok().map(Vec::len));
                    completions.lock().record(partition.index, outcome);
                });
            }
        });

        completions.into_inner()
    }
}
