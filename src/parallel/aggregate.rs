//! Result aggregation.
//!
//! Completions arrive in whatever order partitions finish. [`CompletionMap`]
//! records them against their partition index and [`aggregate`] restores input
//! order, so the output never depends on completion timing.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use crate::error::PartitionFailure;
use crate::types::{PageResult, PartitionOutcome};

/// Completed partitions keyed by partition index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionMap {
    partition_count: usize,
    outcomes: BTreeMap<usize, PartitionOutcome>,
}

impl CompletionMap {
    pub fn new(partition_count: usize) -> Self {
        Self {
            partition_count,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Number of indices that have reported, successfully or not
    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }

    /// Record the outcome for `index`
    ///
    /// Failures are logged here and nowhere else. An out-of-range index is
    /// logged and dropped; a second completion for the same index marks that
    /// partition failed so neither report is trusted.
    pub fn record(&mut self, index: usize, outcome: PartitionOutcome) {
        if index >= self.partition_count {
            warn!(
                "Ignoring completion for partition {} (only {} partitions)",
                index, self.partition_count
            );
            return;
        }

        if self.outcomes.contains_key(&index) {
            let failure = PartitionFailure::Inconsistent(format!(
                "partition {index} reported more than once"
            ));
            error!("Partition {} failed: {}", index, failure);
            self.outcomes.insert(index, Err(failure));
            return;
        }

        match &outcome {
            Ok(pages) => debug!(
                "Partition {}/{} completed ({} pages)",
                index + 1,
                self.partition_count,
                pages.len()
            ),
            Err(failure) => error!("Partition {} failed: {}", index, failure),
        }
        self.outcomes.insert(index, outcome);
    }

    pub fn get(&self, index: usize) -> Option<&PartitionOutcome> {
        self.outcomes.get(&index)
    }

    /// Indices that failed or never reported, in order
    pub fn failed_indices(&self) -> Vec<usize> {
        (0..self.partition_count)
            .filter(|index| !matches!(self.outcomes.get(index), Some(Ok(_))))
            .collect()
    }
}

/// Flatten `completions` into one sequence in partition index order
///
/// Slots start out missing; a slot that never completed or failed contributes
/// nothing and does not shift its neighbours.
pub fn aggregate(completions: &CompletionMap, partition_count: usize) -> Vec<PageResult> {
    let mut slots: Vec<Option<&[PageResult]>> = vec![None; partition_count];

    for (index, slot) in slots.iter_mut().enumerate() {
        match completions.get(index) {
            Some(Ok(pages)) => *slot = Some(pages.as_slice()),
            Some(Err(_)) => {}
            None => warn!("Partition {} never completed, treating as empty", index),
        }
    }

    slots
        .into_iter()
        .flatten()
        .flat_map(|pages| pages.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(range: std::ops::Range<usize>) -> Vec<PageResult> {
        range
            .map(|page_no| PageResult {
                page_no,
                data: serde_json::Value::Null,
            })
            .collect()
    }

    fn page_numbers(results: &[PageResult]) -> Vec<usize> {
        results.iter().map(|p| p.page_no).collect()
    }

    #[test]
    fn test_out_of_order_completions_are_reordered() {
        let mut map = CompletionMap::new(3);
        map.record(2, Ok(pages(8..12)));
        map.record(0, Ok(pages(0..4)));
        map.record(1, Ok(pages(4..8)));

        let results = aggregate(&map, 3);
        assert_eq!(page_numbers(&results), (0..12).collect::<Vec<_>>());
        assert!(map.failed_indices().is_empty());
    }

    #[test]
    fn test_failed_partition_contributes_nothing() {
        let mut map = CompletionMap::new(3);
        map.record(1, Err(PartitionFailure::WorkerExited));
        map.record(2, Ok(pages(8..12)));
        map.record(0, Ok(pages(0..4)));

        let results = aggregate(&map, 3);
        assert_eq!(page_numbers(&results), vec![0, 1, 2, 3, 8, 9, 10, 11]);
        assert_eq!(map.failed_indices(), vec![1]);
    }

    #[test]
    fn test_missing_partition_treated_as_empty() {
        let mut map = CompletionMap::new(2);
        map.record(1, Ok(pages(2..4)));

        assert_eq!(page_numbers(&aggregate(&map, 2)), vec![2, 3]);
        assert_eq!(map.failed_indices(), vec![0]);
    }

    #[test]
    fn test_out_of_range_completion_is_ignored() {
        let mut map = CompletionMap::new(1);
        map.record(0, Ok(pages(0..2)));
        map.record(5, Ok(pages(10..12)));

        assert_eq!(map.completed(), 1);
        assert_eq!(page_numbers(&aggregate(&map, 1)), vec![0, 1]);
    }

    #[test]
    fn test_duplicate_completion_marks_partition_failed() {
        let mut map = CompletionMap::new(2);
        map.record(0, Ok(pages(0..2)));
        map.record(1, Ok(pages(2..4)));
        map.record(0, Ok(pages(0..2)));

        assert_eq!(page_numbers(&aggregate(&map, 2)), vec![2, 3]);
        assert_eq!(map.failed_indices(), vec![0]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let mut map = CompletionMap::new(3);
        map.record(2, Ok(pages(4..6)));
        map.record(0, Ok(pages(0..2)));
        map.record(1, Err(PartitionFailure::Analyzer("boom".to_string())));

        let first = aggregate(&map, 3);
        let second = aggregate(&map, 3);
        assert_eq!(first, second);
    }
}
