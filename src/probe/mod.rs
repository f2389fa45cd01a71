//! Probe pipeline: dispatch, classification, and checkpointing
//!
//! This module contains the core census components:
//! - `fetcher`: the transport seam and the reqwest-backed HTTP transport
//! - `dispatcher`: bounded-concurrency fan-out of one chunk
//! - `classifier`: the ordered WordPress signature table
//! - `processor`: one persisted verdict per probed domain
//! - `coordinator`: batch selection and the chunk loop

mod classifier;
mod coordinator;
mod dispatcher;
mod fetcher;
mod processor;

pub use classifier::{
    classify, classify_response, matching_rule, Check, Inspection, Rule, RULES,
};
pub use coordinator::{finalize_batch, select_batch, Coordinator, RunOptions, RunOutcome};
pub use dispatcher::{DispatchOptions, Dispatcher, ProbeOutcome, ProbeTarget};
pub use fetcher::{
    build_http_client, FailureKind, HttpTransport, ProbeResponse, ProbeResult, Transport,
    MAX_BODY_BYTES,
};
pub use processor::ChunkProcessor;
