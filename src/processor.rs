use tracing::{info, warn};

use crate::config::RunConfig;
use crate::error::FanoutResult;
use crate::invoke::AnalyzerFactory;
use crate::parallel::{PartitionProgress, PoolExecutor, Strategy, aggregate, partition};
use crate::types::{AggregateResult, ProcessingFlags, WorkItem};

/// Fans page work out across a bounded pool and reassembles it in input order
///
/// The factory is used for the single-batch and thread-pool strategies. The
/// process-pool strategy runs `RunConfig::worker_command` instead, and each
/// worker process builds its own analyzer.
pub struct PageFanout<F> {
    config: RunConfig,
    factory: F,
}

impl<F: AnalyzerFactory> PageFanout<F> {
    pub fn new(config: RunConfig, factory: F) -> FanoutResult<Self> {
        config.validate()?;
        info!(
            "PageFanout: {} workers, batch_size={}, backend={:?}",
            config.max_workers, config.batch_size, config.backend
        );
        Ok(Self { config, factory })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Process pages with the strategy chosen from their count
    ///
    /// Blocks until every partition has completed. Failed partitions are
    /// logged and left out of the result; only pool setup or configuration
    /// problems return an error.
    pub fn process(
        &self,
        items: Vec<WorkItem>,
        flags: ProcessingFlags,
    ) -> FanoutResult<AggregateResult> {
        let strategy = Strategy::select(items.len(), &self.config);
        self.process_with_strategy(items, flags, strategy)
    }

    /// Process pages with an explicitly chosen strategy
    pub fn process_with_strategy(
        &self,
        items: Vec<WorkItem>,
        flags: ProcessingFlags,
        strategy: Strategy,
    ) -> FanoutResult<AggregateResult> {
        let total_pages = items.len();
        let partitions = partition(
            items,
            strategy,
            self.config.max_workers,
            self.config.batch_size,
            flags,
        );
        let partition_count = partitions.len();

        if partition_count == 0 {
            return Ok(AggregateResult {
                pages: Vec::new(),
                strategy,
                partition_count: 0,
                failed_partitions: Vec::new(),
            });
        }

        let executor = PoolExecutor::build(strategy, &self.config, partition_count)?;
        info!(
            "Processing {} pages in {} partitions ({}, {} workers)",
            total_pages,
            partition_count,
            strategy,
            executor.workers()
        );

        let progress = PartitionProgress::new(partition_count, strategy, self.config.progress);
        let completions = executor.execute(partitions, &self.factory, &progress);
        progress.finish();

        let pages = aggregate(&completions, partition_count);
        let failed_partitions = completions.failed_indices();
        if failed_partitions.is_empty() {
            info!("Completed {} pages", pages.len());
        } else {
            warn!(
                "{} of {} partitions failed ({:?}); {} of {} pages returned",
                failed_partitions.len(),
                partition_count,
                failed_partitions,
                pages.len(),
                total_pages
            );
        }

        Ok(AggregateResult {
            pages,
            strategy,
            partition_count,
            failed_partitions,
        })
    }
}
