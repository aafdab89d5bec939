use tracing::info;

use crate::config::RunConfig;
use crate::error::{FanoutError, FanoutResult};
use crate::invoke::{AnalyzerFactory, invoke_partition};
use crate::types::Partition;

use super::Strategy;
use super::aggregate::CompletionMap;
use super::process_pool::ProcessPoolExecutor;
use super::progress::PartitionProgress;
use super::thread_pool::ThreadPoolExecutor;

/// Direct execution on the calling thread, no pool
pub struct SingleBatchExecutor;

impl SingleBatchExecutor {
    pub fn execute<F: AnalyzerFactory>(
        partitions: Vec<Partition>,
        factory: &F,
        progress: &PartitionProgress,
    ) -> CompletionMap {
        let mut completions = CompletionMap::new(partitions.len());

        for partition in &partitions {
            let outcome = invoke_partition(factory, partition);
            progress.partition_done(outcome.as_ref().ok().map(Vec::len));
            completions.record(partition.index, outcome);
        }

        completions
    }
}

/// Executor for one run, built for the selected strategy
///
/// The pool is acquired when this is built and released when `execute`
/// returns, on every path.
pub enum PoolExecutor {
    Direct,
    Threads(ThreadPoolExecutor),
    Processes(ProcessPoolExecutor),
}

impl PoolExecutor {
    /// Build the executor for `strategy`, sized for `partition_count` partitions
    pub fn build(
        strategy: Strategy,
        config: &RunConfig,
        partition_count: usize,
    ) -> FanoutResult<Self> {
        match strategy {
            Strategy::SingleBatch => Ok(PoolExecutor::Direct),
            Strategy::ThreadPool => Ok(PoolExecutor::Threads(ThreadPoolExecutor::new(
                config.max_workers,
            )?)),
            Strategy::ProcessPool => {
                if config.worker_command.is_empty() {
                    return Err(FanoutError::Config(
                        "process-pool strategy requires a worker_command".into(),
                    ));
                }
                // Never start more processes than there is work for
                let workers = std::cmp::min(config.max_workers, partition_count.max(1));
                Ok(PoolExecutor::Processes(ProcessPoolExecutor::spawn(
                    &config.worker_command,
                    workers,
                )?))
            }
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            PoolExecutor::Direct => 1,
            PoolExecutor::Threads(pool) => pool.max_workers(),
            PoolExecutor::Processes(pool) => pool.worker_count(),
        }
    }

    /// Run every partition to completion, isolating failures per partition
    pub fn execute<F: AnalyzerFactory>(
        self,
        partitions: Vec<Partition>,
        factory: &F,
        progress: &PartitionProgress,
    ) -> CompletionMap {
        let partition_count = partitions.len();
        info!(
            "Dispatching {} partitions across {} workers",
            partition_count,
            self.workers()
        );

        match self {
            PoolExecutor::Direct => SingleBatchExecutor::execute(partitions, factory, progress),
            PoolExecutor::Threads(pool) => pool.execute(partitions, factory, progress),
            PoolExecutor::Processes(pool) => pool.execute(partitions, progress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::invoke::PageAnalyzer;
    use crate::types::{PageMeta, PageResult, ProcessingFlags, WorkItem};
    use anyhow::Result;

    struct Echo;

    impl PageAnalyzer for Echo {
        fn analyze(&mut self, items: &[WorkItem], _flags: ProcessingFlags) -> Result<Vec<PageResult>> {
            Ok(items
                .iter()
                .map(|item| PageResult {
                    page_no: item.page_no,
                    data: serde_json::Value::Null,
                })
                .collect())
        }
    }

    fn single_partition(pages: usize) -> Vec<Partition> {
        vec![Partition {
            index: 0,
            items: (0..pages)
                .map(|p| WorkItem::new(p, Vec::new(), PageMeta::default()))
                .collect(),
            flags: ProcessingFlags::default(),
        }]
    }

    #[test]
    fn test_single_batch_executor() {
        let progress = PartitionProgress::new(1, Strategy::SingleBatch, false);
        let factory = || -> Result<Echo> { Ok(Echo) };
        let completions = SingleBatchExecutor::execute(single_partition(5), &factory, &progress);

        assert_eq!(completions.completed(), 1);
        assert!(matches!(completions.get(0), Some(Ok(pages)) if pages.len() == 5));
    }

    #[test]
    fn test_build_direct_and_threads() {
        let config = RunConfig::default().with_max_workers(3);
        assert!(matches!(
            PoolExecutor::build(Strategy::SingleBatch, &config, 1).unwrap(),
            PoolExecutor::Direct
        ));

        let threads = PoolExecutor::build(Strategy::ThreadPool, &config, 10).unwrap();
        assert_eq!(threads.workers(), 3);
    }

    #[test]
    fn test_process_strategy_without_command_is_config_error() {
        let config = RunConfig {
            backend: Backend::Thread,
            ..RunConfig::default()
        };
        assert!(matches!(
            PoolExecutor::build(Strategy::ProcessPool, &config, 4),
            Err(FanoutError::Config(_))
        ));
    }
}
