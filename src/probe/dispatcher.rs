//! Bounded-concurrency probe dispatch
//!
//! This module fans one chunk of domains out over a fixed pool of workers:
//! - Workers pull the next target from a shared cursor over the chunk
//! - Each worker has at most one request in flight, so the pool size is the cap
//! - Every result lands in its own slot of a preallocated table
//! - Each probe runs in its own task, so a panic fails only that slot
//! - The join waits for all slots; a slot left empty anyway is filled with
//!   a failure marker

use crate::probe::fetcher::{FailureKind, ProbeResult, Transport};
use crate::storage::DomainRecord;
use crate::url::probe_url;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// A domain to probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTarget {
    pub domain_id: i64,
    pub hostname: String,
}

impl From<&DomainRecord> for ProbeTarget {
    fn from(record: &DomainRecord) -> Self {
        Self {
            domain_id: record.id,
            hostname: record.domain.clone(),
        }
    }
}

/// The result for one target
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub domain_id: i64,
    pub hostname: String,
    pub result: ProbeResult,
}

/// Dispatch limits
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum requests in flight at once
    pub concurrency: usize,

    /// Upper bound on a single probe, enforced around the transport
    pub request_timeout: Duration,

    /// Scheme of the probed root URL
    pub scheme: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 200,
            request_timeout: Duration::from_secs(10),
            scheme: "https".to_string(),
        }
    }
}

/// Issues one probe per domain under a global concurrency cap
pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    options: DispatchOptions,
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher over the given transport
    pub fn new(transport: T, mut options: DispatchOptions) -> Self {
        options.concurrency = options.concurrency.max(1);
        Self {
            transport: Arc::new(transport),
            options,
        }
    }

    /// Returns the dispatch limits
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Returns the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probes every target and returns exactly one outcome per target, in input order
    ///
    /// Returns only after every request has produced a response or failed.
    pub async fn probe(&self, targets: &[ProbeTarget]) -> Vec<ProbeOutcome> {
        if targets.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let work: Arc<Vec<ProbeTarget>> = Arc::new(targets.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ProbeResult)>();

        let workers = self.options.concurrency.min(targets.len());
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let work = Arc::clone(&work);
            let cursor = Arc::clone(&cursor);
            let transport = Arc::clone(&self.transport);
            let tx = tx.clone();
            let scheme = self.options.scheme.clone();
            let timeout = self.options.request_timeout;

            pool.spawn(async move {
                loop {
                    let slot = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(target) = work.get(slot).cloned() else {
                        break;
                    };
                    let hostname = target.hostname.clone();

                    // A panicking probe must only cost its own slot
                    let transport = Arc::clone(&transport);
                    let scheme = scheme.clone();
                    let probe = tokio::spawn(async move {
                        probe_one(transport.as_ref(), &scheme, &target, timeout).await
                    });
                    let result = match probe.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!("Probe of {} aborted: {}", hostname, e);
                            ProbeResult::failure(FailureKind::Other, format!("probe aborted: {}", e))
                        }
                    };

                    if tx.send((slot, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Probe worker aborted: {}", e);
            }
        }

        let mut slots: Vec<Option<ProbeResult>> = vec![None; targets.len()];
        while let Ok((slot, result)) = rx.try_recv() {
            slots[slot] = Some(result);
        }

        let outcomes: Vec<ProbeOutcome> = targets
            .iter()
            .zip(slots)
            .map(|(target, slot)| ProbeOutcome {
                domain_id: target.domain_id,
                hostname: target.hostname.clone(),
                result: slot.unwrap_or_else(|| {
                    ProbeResult::failure(FailureKind::Other, "probe task ended without a result")
                }),
            })
            .collect();

        let failures = outcomes.iter().filter(|o| o.result.is_failure()).count();
        tracing::debug!(
            "Probed {} domains with {} workers in {:?} ({} failed)",
            outcomes.len(),
            workers,
            started.elapsed(),
            failures
        );

        outcomes
    }
}

/// Probes a single target, converting every problem into a failure marker
async fn probe_one<T: Transport>(
    transport: &T,
    scheme: &str,
    target: &ProbeTarget,
    timeout: Duration,
) -> ProbeResult {
    let url = match probe_url(scheme, &target.hostname) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Skipping request for {}: {}", target.hostname, e);
            return ProbeResult::failure(FailureKind::InvalidHost, e.to_string());
        }
    };

    let result = match tokio::time::timeout(timeout, transport.fetch(url)).await {
        Ok(result) => result,
        Err(_) => ProbeResult::failure(
            FailureKind::Timeout,
            format!("no response within {:?}", timeout),
        ),
    };

    if let ProbeResult::Failure { kind, message } = &result {
        tracing::trace!("{}: {} ({})", target.hostname, kind, message);
    }

    result
}
