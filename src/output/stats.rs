//! Statistics of a finished scrape batch
//!
//! This module provides functionality for summarizing a batch from the
//! scraper's store snapshot and event log.

use crate::extract::Record;
use crate::pipeline::LogEntry;
use crate::storage::StoreSnapshot;
use std::time::Duration;

/// Batch statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatistics {
    /// Number of URLs submitted to the batch
    pub urls_attempted: usize,

    /// Number of distinct records stored
    pub records_stored: usize,

    /// Number of entries in the failed-URL queue
    pub urls_failed: usize,

    /// Number of event log entries
    pub log_entries: usize,

    /// Wall-clock time from submission to completion
    pub elapsed: Duration,
}

impl BatchStatistics {
    /// Collects statistics from a snapshot taken after the batch completed
    pub fn collect<R: Record>(
        urls_attempted: usize,
        snapshot: &StoreSnapshot<R>,
        log: &[LogEntry],
        elapsed: Duration,
    ) -> Self {
        Self {
            urls_attempted,
            records_stored: snapshot.records.len(),
            urls_failed: snapshot.failed_urls.len(),
            log_entries: log.len(),
            elapsed,
        }
    }

    /// Share of attempted URLs that did not end up in the failed queue
    pub fn success_rate(&self) -> f64 {
        if self.urls_attempted == 0 {
            return 0.0;
        }
        let succeeded = self.urls_attempted.saturating_sub(self.urls_failed);
        (succeeded as f64 / self.urls_attempted as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &BatchStatistics) {
    println!("=== Batch Statistics ===\n");

    println!("Overview:");
    println!("  URLs attempted: {}", stats.urls_attempted);
    println!("  Records stored: {}", stats.records_stored);
    println!("  Failed URLs: {}", stats.urls_failed);
    println!("  Log entries: {}", stats.log_entries);
    println!("  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} URLs scraped)",
        stats.success_rate(),
        stats.urls_attempted.saturating_sub(stats.urls_failed),
        stats.urls_attempted
    );
}
