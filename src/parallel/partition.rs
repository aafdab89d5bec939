use crate::types::{Partition, ProcessingFlags, WorkItem};

use super::Strategy;

/// Chunk step for the process pool: `max(2, total / max_workers)`
pub fn process_chunk_size(total_items: usize, max_workers: usize) -> usize {
    std::cmp::max(2, total_items / max_workers.max(1))
}

/// Split `items` into ordered, contiguous partitions for `strategy`
///
/// - `ProcessPool`: windows of [`process_chunk_size`]; the last window absorbs the
///   remainder, so it is never smaller than the step (unless it is the only one).
/// - `ThreadPool`: `batch_size` windows, the last one possibly shorter.
/// - `SingleBatch`: one partition holding everything.
///
/// Empty input yields no partitions. Partition `index` equals its position.
pub fn partition(
    items: Vec<WorkItem>,
    strategy: Strategy,
    max_workers: usize,
    batch_size: usize,
    flags: ProcessingFlags,
) -> Vec<Partition> {
    if items.is_empty() {
        return Vec::new();
    }

    let total = items.len();
    let sizes = match strategy {
        Strategy::SingleBatch => vec![total],
        Strategy::ThreadPool => fixed_windows(total, batch_size.max(1)),
        Strategy::ProcessPool => remainder_absorbing_windows(total, process_chunk_size(total, max_workers)),
    };

    let mut remaining = items.into_iter();
    sizes
        .into_iter()
        .enumerate()
        .map(|(index, size)| Partition {
            index,
            items: remaining.by_ref().take(size).collect(),
            flags,
        })
        .collect()
}

fn fixed_windows(total: usize, size: usize) -> Vec<usize> {
    let mut sizes = vec![size; total / size];
    if total % size != 0 {
        sizes.push(total % size);
    }
    sizes
}

fn remainder_absorbing_windows(total: usize, step: usize) -> Vec<usize> {
    let count = std::cmp::max(1, total / step);
    let mut sizes = vec![step; count];
    if let Some(last) = sizes.last_mut() {
        *last = total - step * (count - 1);
    }
    sizes
}
