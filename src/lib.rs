//! # page-fanout
//!
//! Fans a large, ordered sequence of document pages out across a bounded pool
//! of parallel executors and reassembles the results in input order.
//!
//! - **Strategies**: direct single batch, rayon thread pool, or a pool of
//!   worker processes speaking a JSON line protocol
//! - **Order stability**: output order depends only on input order, never on
//!   which partition finished first
//! - **Failure isolation**: a failing partition contributes nothing and never
//!   takes its siblings or the run down with it
//!
//! ## Quick Start
//!
//! ```rust
//! use page_fanout::{PageAnalyzer, PageFanout, PageMeta, PageResult, ProcessingFlags, RunConfig, WorkItem};
//!
//! struct PageCounter;
//!
//! impl PageAnalyzer for PageCounter {
//!     fn analyze(&mut self, items: &[WorkItem], _flags: ProcessingFlags) -> anyhow::Result<Vec<PageResult>> {
//!         Ok(items
//!             .iter()
//!             .map(|item| PageResult { page_no: item.page_no, data: serde_json::json!(item.payload.len()) })
//!             .collect())
//!     }
//! }
//!
//! let fanout = PageFanout::new(RunConfig::default(), || Ok::<_, anyhow::Error>(PageCounter))?;
//! let pages: Vec<WorkItem> = (0..10)
//!     .map(|page| WorkItem::new(page, vec![0; page], PageMeta::default()))
//!     .collect();
//!
//! let result = fanout.process(pages, ProcessingFlags::default())?;
//! assert_eq!(result.len(), 10);
//! # Ok::<(), page_fanout::FanoutError>(())
//! ```

pub mod config;
pub mod error;
pub mod invoke;
pub mod logging;
pub mod parallel;
pub mod processor;
pub mod types;
pub mod worker;

pub use config::{Backend, RunConfig};
pub use error::{FanoutError, FanoutResult, PartitionFailure};
pub use invoke::{AnalyzerFactory, PageAnalyzer};
pub use parallel::Strategy;
pub use processor::PageFanout;
pub use types::{AggregateResult, PageMeta, PageResult, Partition, ProcessingFlags, WorkItem};

/// Result type alias for analyzer and worker code
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
