use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use super::Strategy;

/// Live partition progress for one run, hidden unless enabled
#[derive(Clone)]
pub struct PartitionProgress {
    bar: ProgressBar,
    pages: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl PartitionProgress {
    pub fn new(partition_count: usize, strategy: Strategy, enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(partition_count as u64)
        } else {
            ProgressBar::hidden()
        };

        // Template is a constant; fall back to the default style if it ever fails to parse
        let style = ProgressStyle::with_template(&format!(
            "⚡ {} [{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos:>4}}/{{len:4}} partitions {{msg}}",
            strategy.name()
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);

        Self {
            bar,
            pages: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mark one partition done; `pages` is `None` for a failed partition
    pub fn partition_done(&self, pages: Option<usize>) {
        match pages {
            Some(count) => {
                self.pages.fetch_add(count, Ordering::Relaxed);
            }
            None => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.bar.inc(1);
        self.bar.set_message(format!(
            "📄 {} pages | ✖ {} failed",
            self.pages.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        ));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_tracks_position() {
        let progress = PartitionProgress::new(3, Strategy::ThreadPool, false);
        progress.partition_done(Some(4));
        progress.partition_done(None);
        assert_eq!(progress.position(), 2);
        progress.finish();
    }

    #[test]
    fn test_clones_share_counters() {
        let progress = PartitionProgress::new(2, Strategy::ProcessPool, false);
        let other = progress.clone();
        other.partition_done(Some(2));
        progress.partition_done(Some(2));
        assert_eq!(progress.pages.load(Ordering::Relaxed), 4);
    }
}
