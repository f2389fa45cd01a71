use crate::state::Verdict;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Statistics for one coordinator invocation
///
/// Counters live only in memory. A resumed run starts from zero, so its
/// percentages describe the new invocation, not the whole batch.
#[derive(Debug, Clone)]
pub struct RunCounters {
    /// Domains that received a terminal status in this run
    pub processed: u64,

    /// Domains classified positive
    pub positive: u64,

    /// Domains classified negative
    pub negative: u64,

    /// Domains that produced no usable reply
    pub no_reply: u64,

    /// Chunks fully processed
    pub chunks: u64,

    /// Progress lines emitted so far
    pub progress_reports: u64,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Monotonic start of the run, used for rates
    started: Instant,
}

impl RunCounters {
    /// Starts a fresh set of counters at the current instant
    pub fn start() -> Self {
        Self {
            processed: 0,
            positive: 0,
            negative: 0,
            no_reply: 0,
            chunks: 0,
            progress_reports: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Records one classified domain
    pub fn record(&mut self, verdict: Verdict) {
        self.processed += 1;
        match verdict {
            Verdict::Positive => self.positive += 1,
            Verdict::Negative => self.negative += 1,
            Verdict::NoReply => self.no_reply += 1,
        }
    }

    /// Time elapsed since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Percentage of positives among domains that replied
    ///
    /// Returns 0.0 while no domain has resolved to positive or negative.
    pub fn positive_rate(&self) -> f64 {
        let replied = self.positive + self.negative;
        if replied == 0 {
            0.0
        } else {
            self.positive as f64 / replied as f64 * 100.0
        }
    }

    /// Average wall-clock seconds spent per processed domain
    pub fn seconds_per_request(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.elapsed().as_secs_f64() / self.processed as f64
        }
    }
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::start()
    }
}
