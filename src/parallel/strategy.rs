use serde::{Deserialize, Serialize};

use crate::config::{Backend, RunConfig};

/// Parallelism strategy for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One direct invocation on the calling thread, no pool
    SingleBatch,
    /// Fixed-size batches on a bounded thread pool
    ThreadPool,
    /// Worker-ceiling-sized chunks on a bounded pool of worker processes
    ProcessPool,
}

impl Strategy {
    /// Select the strategy for `total_items` work items
    ///
    /// Pure function of the item count and the configuration:
    ///
    /// ```text
    /// backend = process                                 → ProcessPool (never short-circuits)
    /// backend = thread, total <= threshold              → SingleBatch
    /// backend = thread, otherwise                       → ThreadPool
    /// ```
    ///
    /// # Example
    /// ```rust
    /// use page_fanout::config::RunConfig;
    /// use page_fanout::parallel::Strategy;
    ///
    /// let config = RunConfig { max_workers: 4, ..RunConfig::default() };
    /// assert_eq!(Strategy::select(5, &config), Strategy::SingleBatch);
    /// assert_eq!(Strategy::select(12, &config), Strategy::ThreadPool);
    /// ```
    pub fn select(total_items: usize, config: &RunConfig) -> Self {
        match config.backend {
            Backend::Process => Strategy::ProcessPool,
            Backend::Thread => {
                if total_items <= config.single_batch_threshold {
                    Strategy::SingleBatch
                } else {
                    Strategy::ThreadPool
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SingleBatch => "single-batch",
            Strategy::ThreadPool => "thread-pool",
            Strategy::ProcessPool => "process-pool",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_config(max_workers: usize) -> RunConfig {
        RunConfig {
            max_workers,
            backend: Backend::Thread,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_small_thread_runs_are_single_batch() {
        let config = thread_config(4);
        for total in 0..=6 {
            assert_eq!(Strategy::select(total, &config), Strategy::SingleBatch);
        }
        assert_eq!(Strategy::select(7, &config), Strategy::ThreadPool);
    }

    #[test]
    fn test_single_worker_ceiling_still_batches() {
        assert_eq!(Strategy::select(6, &thread_config(1)), Strategy::SingleBatch);
        assert_eq!(Strategy::select(100, &thread_config(1)), Strategy::ThreadPool);
    }

    #[test]
    fn test_process_backend_always_pools() {
        let config = RunConfig {
            backend: Backend::Process,
            worker_command: vec!["worker".to_string()],
            ..RunConfig::default()
        };
        assert_eq!(Strategy::select(1, &config), Strategy::ProcessPool);
        assert_eq!(Strategy::select(1000, &config), Strategy::ProcessPool);
    }

    #[test]
    fn test_custom_threshold() {
        let config = RunConfig {
            single_batch_threshold: 10,
            ..thread_config(4)
        };
        assert_eq!(Strategy::select(10, &config), Strategy::SingleBatch);
        assert_eq!(Strategy::select(11, &config), Strategy::ThreadPool);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Strategy::ThreadPool.to_string(), "thread-pool");
        assert_eq!(Strategy::SingleBatch.name(), "single-batch");
    }
}
