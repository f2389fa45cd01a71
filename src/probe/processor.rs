//! Chunk processing: verdicts, persistence, and counters
//!
//! Every outcome of a chunk becomes exactly one status write. A storage error
//! stops the chunk; domains not yet written stay untested and are picked up
//! by the next pass.

use crate::output::ProgressReporter;
use crate::probe::classifier::classify_response;
use crate::probe::dispatcher::ProbeOutcome;
use crate::probe::fetcher::ProbeResult;
use crate::state::{RunCounters, Verdict};
use crate::storage::{Storage, StorageResult};
use chrono::Utc;

/// Turns probe outcomes into persisted verdicts
#[derive(Debug, Clone, Default)]
pub struct ChunkProcessor {
    reporter: ProgressReporter,
}

impl ChunkProcessor {
    pub fn new(reporter: ProgressReporter) -> Self {
        Self { reporter }
    }

    /// Resolves the verdict for one outcome
    ///
    /// Failure markers short-circuit to no-reply without touching the classifier.
    pub fn verdict(outcome: &ProbeOutcome) -> Verdict {
        match &outcome.result {
            ProbeResult::Failure { .. } => Verdict::NoReply,
            ProbeResult::Response(response) => classify_response(response),
        }
    }

    /// Classifies and persists a chunk, one write per domain
    ///
    /// Counters are updated and the reporter consulted after each applied
    /// write. A write refused because the domain already holds a different
    /// terminal status is logged and not counted.
    ///
    /// # Returns
    ///
    /// The number of writes applied
    pub fn process<S: Storage + ?Sized>(
        &self,
        storage: &mut S,
        outcomes: &[ProbeOutcome],
        counters: &mut RunCounters,
    ) -> StorageResult<u64> {
        let mut applied = 0;

        for outcome in outcomes {
            let verdict = Self::verdict(outcome);
            tracing::debug!("{} -> {}", outcome.hostname, verdict);

            if !storage.update_domain_status(outcome.domain_id, verdict.status(), Utc::now())? {
                continue;
            }

            applied += 1;
            counters.record(verdict);
            if self.reporter.report(counters).is_some() {
                counters.progress_reports += 1;
            }
        }

        counters.chunks += 1;
        Ok(applied)
    }
}
