//! Order-preserving parallel execution of page partitions
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Strategy Selection**: single-batch, thread-pool or process-pool from the page count and [`RunConfig`](crate::config::RunConfig)
//! - **Partitioning**: contiguous, indexed slices of the input
//! - **Execution**: bounded thread (rayon) or process pools, every partition submitted at once
//! - **Aggregation**: out-of-order completions put back into input order
//!
//! ## What This Module Does NOT Do:
//! - **Page Analysis**: delegated to a [`PageAnalyzer`](crate::invoke::PageAnalyzer)
//! - **Retries**: a failed partition's pages are simply missing from the result
//! - **Cancellation or Timeouts**: a run always waits for every partition
//!
//! # Flow
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Strategy │──▶│ Partitioner │──▶│ PoolExecutor │──▶│ Aggregator  │──▶ caller
//! │ select   │   │ partition() │   │ (N submits)  │   │ reorder +   │
//! │          │   │             │   │ any order    │   │ flatten     │
//! └──────────┘   └─────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use page_fanout::config::RunConfig;
//! use page_fanout::parallel::{Strategy, partition};
//! use page_fanout::{PageMeta, ProcessingFlags, WorkItem};
//!
//! let config = RunConfig::default().with_max_workers(4);
//! let items: Vec<WorkItem> = (0..12)
//!     .map(|page| WorkItem::new(page, Vec::new(), PageMeta::default()))
//!     .collect();
//!
//! let strategy = Strategy::select(items.len(), &config);
//! assert_eq!(strategy, Strategy::ThreadPool);
//!
//! let partitions = partition(items, strategy, config.max_workers, config.batch_size, ProcessingFlags::default());
//! assert_eq!(partitions.len(), 3);
//! ```

pub mod aggregate;
pub mod core;
pub mod partition;
pub mod process_pool;
pub mod progress;
pub mod strategy;
pub mod thread_pool;

// Re-export main types for easier access
pub use aggregate::{CompletionMap, aggregate};
pub use self::core::{PoolExecutor, SingleBatchExecutor};
pub use partition::{partition, process_chunk_size};
pub use progress::PartitionProgress;
pub use strategy::Strategy;
