//! Batch coordinator - main census orchestration logic
//!
//! This module contains the drive loop that ties the pipeline together:
//! - Selecting the batch to work on (fresh or resumable)
//! - Flipping the batch `started` flag
//! - Pulling chunks of untested domains until none are left
//! - Dispatching probes and handing outcomes to the chunk processor
//!
//! Chunks are strictly sequential: every write of chunk N lands before chunk
//! N+1 is pulled. Only storage errors end a run early, and they leave the
//! batch started but not completed so that `--resume` can pick it up.

use crate::config::Config;
use crate::output::{log_run_summary, ProgressReporter};
use crate::probe::dispatcher::{DispatchOptions, Dispatcher, ProbeTarget};
use crate::probe::fetcher::{HttpTransport, Transport};
use crate::probe::processor::ChunkProcessor;
use crate::state::{DomainStatus, RunCounters};
use crate::storage::{BatchRecord, Storage, StorageResult};
use crate::{CensusError, Result};

/// Per-invocation run parameters
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Work on the oldest started-but-not-completed batch instead of a fresh one
    pub resume: bool,

    /// Untested domains pulled per chunk
    pub chunk_size: u32,

    /// Untested domains skipped at the start of every pull
    pub offset: u64,

    /// Processed domains between two progress lines
    pub report_every: u64,
}

impl RunOptions {
    /// Builds run options from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            resume: config.probe.resume,
            chunk_size: config.probe.chunk_size,
            offset: config.probe.offset,
            report_every: config.progress.report_every,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            resume: false,
            chunk_size: 200,
            offset: 0,
            report_every: 200,
        }
    }
}

/// How a coordinator invocation ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No batch matched the selection; nothing was touched
    NoEligibleBatch,

    /// The batch ran out of untested domains
    Completed {
        batch: BatchRecord,
        counters: RunCounters,
    },
}

/// Picks the batch to work on
///
/// With `resume`, the oldest batch that was started and never completed;
/// otherwise the oldest batch that was never started.
pub fn select_batch<S: Storage + ?Sized>(
    storage: &S,
    resume: bool,
) -> StorageResult<Option<BatchRecord>> {
    if resume {
        storage.oldest_batch(true, Some(false))
    } else {
        storage.oldest_batch(false, None)
    }
}

/// Marks a batch completed once none of its domains are untested
///
/// # Returns
///
/// * `Ok(BatchRecord)` - The updated batch
/// * `Err(CensusError::BatchNotExhausted)` - Untested domains remain
pub fn finalize_batch<S: Storage + ?Sized>(storage: &mut S, batch_id: i64) -> Result<BatchRecord> {
    let batch = storage.get_batch(batch_id)?;
    if batch.completed {
        tracing::info!("Batch {} is already completed", batch_id);
        return Ok(batch);
    }

    let remaining = storage.count_domains_by_status(batch_id, DomainStatus::Untested)?;
    if remaining > 0 {
        return Err(CensusError::BatchNotExhausted {
            batch_id,
            remaining,
        });
    }

    storage.mark_batch_completed(batch_id)?;
    tracing::info!("Batch {} ({}) marked completed", batch_id, batch.provider);
    Ok(storage.get_batch(batch_id)?)
}

/// Main census coordinator structure
pub struct Coordinator<S: Storage, T: Transport> {
    storage: S,
    dispatcher: Dispatcher<T>,
    processor: ChunkProcessor,
    options: RunOptions,
}

impl<S: Storage> Coordinator<S, HttpTransport> {
    /// Creates a coordinator probing over HTTP with the configured client
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `storage` - The persistence backend
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CensusError)` - The HTTP client could not be built
    pub fn from_config(config: &Config, storage: S) -> Result<Self> {
        let transport = HttpTransport::new(
            &config.user_agent,
            config.probe.request_timeout(),
            config.probe.max_redirects,
        )?;

        let dispatch = DispatchOptions {
            concurrency: config.probe.concurrency as usize,
            request_timeout: config.probe.request_timeout(),
            scheme: config.probe.scheme.clone(),
        };

        Ok(Self::new(
            storage,
            transport,
            dispatch,
            RunOptions::from_config(config),
        ))
    }
}

impl<S: Storage, T: Transport> Coordinator<S, T> {
    /// Creates a coordinator over any transport
    pub fn new(storage: S, transport: T, dispatch: DispatchOptions, options: RunOptions) -> Self {
        Self {
            storage,
            dispatcher: Dispatcher::new(transport, dispatch),
            processor: ChunkProcessor::new(ProgressReporter::new(options.report_every)),
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Gives the storage back, e.g. to reopen a run after an error
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Selects the batch this coordinator would work on
    pub fn select_batch(&self) -> StorageResult<Option<BatchRecord>> {
        select_batch(&self.storage, self.options.resume)
    }

    /// Runs one census pass
    ///
    /// # Returns
    ///
    /// * `Ok(RunOutcome::NoEligibleBatch)` - Nothing to do
    /// * `Ok(RunOutcome::Completed)` - The batch has no untested domains left
    ///   past the offset
    /// * `Err(CensusError)` - A storage error aborted the run
    pub async fn run(&mut self) -> Result<RunOutcome> {
        let batch = match self.select_batch()? {
            Some(batch) => batch,
            None => {
                if self.options.resume {
                    tracing::info!("No resumable batch found, nothing to do");
                } else {
                    tracing::info!("No unstarted batch found, nothing to do");
                }
                return Ok(RunOutcome::NoEligibleBatch);
            }
        };

        let counters = self.drive(&batch).await?;
        log_run_summary(batch.id, &counters);

        let batch = self.storage.get_batch(batch.id)?;
        Ok(RunOutcome::Completed { batch, counters })
    }

    /// Processes a batch chunk by chunk until no untested domain is left
    pub async fn drive(&mut self, batch: &BatchRecord) -> Result<RunCounters> {
        tracing::info!(
            "{} batch {} ({}), chunk size {}, offset {}, concurrency {}",
            if self.options.resume { "Resuming" } else { "Starting" },
            batch.id,
            batch.provider,
            self.options.chunk_size,
            self.options.offset,
            self.dispatcher.options().concurrency
        );

        self.storage.mark_batch_started(batch.id)?;

        let mut counters = RunCounters::start();

        loop {
            let chunk = self.storage.untested_domains(
                batch.id,
                self.options.offset,
                self.options.chunk_size,
            )?;
            if chunk.is_empty() {
                tracing::info!("No untested domains left in batch {}", batch.id);
                break;
            }

            let targets: Vec<ProbeTarget> = chunk.iter().map(ProbeTarget::from).collect();
            tracing::debug!(
                "Chunk {}: probing {} domains starting at id {}",
                counters.chunks + 1,
                targets.len(),
                targets[0].domain_id
            );

            let outcomes = self.dispatcher.probe(&targets).await;
            let applied = self
                .processor
                .process(&mut self.storage, &outcomes, &mut counters)?;

            // Pulling again would return the same rows forever
            if applied == 0 {
                tracing::warn!(
                    "Chunk of {} domains in batch {} applied no updates, stopping",
                    targets.len(),
                    batch.id
                );
                break;
            }
        }

        Ok(counters)
    }
}
