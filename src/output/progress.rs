//! Periodic progress lines for a running census
//!
//! The reporter is consulted after every processed domain and emits a line
//! to the operator log only when the processed count hits the interval.

use crate::state::RunCounters;
use std::fmt;

/// Default number of processed domains between two progress lines
pub const DEFAULT_REPORT_EVERY: u64 = 200;

/// One emitted progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Domains processed so far in this run
    pub processed: u64,

    /// Positives as a percentage of positive + negative
    pub positive_rate: f64,

    /// Average seconds per processed domain since the run started
    pub seconds_per_request: f64,
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {} domains processed, {:.2}% WordPress, {:.3}s per request",
            self.processed, self.positive_rate, self.seconds_per_request
        )
    }
}

/// Emits progress every `interval` processed domains
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    interval: u64,
}

impl ProgressReporter {
    /// Creates a reporter; an interval of zero is treated as one
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Logs a progress line if the processed count is a multiple of the interval
    ///
    /// Returns the emitted report, or `None` when nothing was due.
    pub fn report(&self, counters: &RunCounters) -> Option<ProgressReport> {
        if counters.processed == 0 || counters.processed % self.interval != 0 {
            return None;
        }

        let report = ProgressReport {
            processed: counters.processed,
            positive_rate: counters.positive_rate(),
            seconds_per_request: counters.seconds_per_request(),
        };
        tracing::info!("{}", report);
        Some(report)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_EVERY)
    }
}

/// Formats the end-of-run summary line
pub fn run_summary(batch_id: i64, counters: &RunCounters) -> String {
    format!(
        "Batch {} pass started at {} finished in {:.1}s: {} processed ({} WordPress, {} other, {} no reply), {:.2}% WordPress, {} chunks",
        batch_id,
        counters.started_at.to_rfc3339(),
        counters.elapsed().as_secs_f64(),
        counters.processed,
        counters.positive,
        counters.negative,
        counters.no_reply,
        counters.positive_rate(),
        counters.chunks
    )
}

/// Logs the end-of-run summary
pub fn log_run_summary(batch_id: i64, counters: &RunCounters) {
    tracing::info!("{}", run_summary(batch_id, counters));
}
