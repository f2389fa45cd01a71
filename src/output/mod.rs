//! Operator-facing output
//!
//! This module handles:
//! - Periodic progress lines while a batch is being probed
//! - The end-of-run summary
//! - Per-batch statistics read back from storage

pub mod progress;
pub mod stats;

pub use progress::{
    log_run_summary, run_summary, ProgressReport, ProgressReporter, DEFAULT_REPORT_EVERY,
};
pub use stats::{load_statistics, print_statistics, BatchStatistics};
