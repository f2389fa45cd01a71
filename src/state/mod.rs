//! State module for tracking classification progress
//!
//! # Components
//!
//! - `DomainStatus`: persisted status of a domain (untested or one of the terminal verdicts)
//! - `Verdict`: classifier output
//! - `RunCounters`: in-memory statistics scoped to one coordinator invocation

mod counters;
mod status;

// Re-export main types
pub use counters::RunCounters;
pub use status::{DomainStatus, Verdict};
