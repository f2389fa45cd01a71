//! wp-census main entry point
//!
//! This is the command-line interface for the WordPress census prober.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wp_census::config::{load_config_with_hash, validate, Config};
use wp_census::output::{load_statistics, print_statistics};
use wp_census::probe::{finalize_batch, Coordinator, RunOutcome};
use wp_census::storage::open_storage;

/// wp-census: WordPress adoption census
///
/// wp-census probes every domain of an imported batch once, classifies the
/// response against a catalogue of WordPress signatures, and records one
/// verdict per domain. Interrupted batches can be resumed.
#[derive(Parser, Debug)]
#[command(name = "wp-census")]
#[command(version = "1.0.0")]
#[command(about = "WordPress adoption census over ranked domain lists", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Continue the oldest started but unfinished batch
    #[arg(long)]
    resume: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    request_timeout: Option<u64>,

    /// Untested domains pulled per chunk
    #[arg(long, value_name = "N")]
    chunk_size: Option<u32>,

    /// Maximum requests in flight
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Processed domains between progress lines
    #[arg(long, value_name = "N")]
    report_every: Option<u64>,

    /// Untested domains to skip at the start of every chunk pull
    #[arg(long, value_name = "N")]
    offset: Option<u64>,

    /// Redirect hops followed before a probe fails
    #[arg(long, value_name = "N")]
    max_redirects: Option<u32>,

    /// Show per-batch statistics from the database and exit
    #[arg(long, conflicts_with_all = ["finalize", "resume"])]
    stats: bool,

    /// Mark a fully classified batch as completed and exit
    #[arg(long, value_name = "BATCH_ID", conflicts_with_all = ["stats", "resume"])]
    finalize: Option<i64>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(timeout) = self.request_timeout {
            config.probe.request_timeout = timeout;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.probe.chunk_size = chunk_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.probe.concurrency = concurrency;
        }
        if let Some(report_every) = self.report_every {
            config.progress.report_every = report_every;
        }
        if let Some(max_redirects) = self.max_redirects {
            config.probe.max_redirects = max_redirects;
        }
        if let Some(offset) = self.offset {
            config.probe.offset = offset;
        }
        if self.resume {
            config.probe.resume = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid command-line override")?;

    if cli.stats {
        handle_stats(&config)
    } else if let Some(batch_id) = cli.finalize {
        handle_finalize(&config, batch_id)
    } else {
        handle_run(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wp_census=info,warn"),
            1 => EnvFilter::new("wp_census=debug,info"),
            2 => EnvFilter::new("wp_census=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows per-batch statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --finalize mode: marks a batch completed
fn handle_finalize(config: &Config, batch_id: i64) -> Result<()> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;

    let batch = finalize_batch(&mut storage, batch_id)
        .with_context(|| format!("Failed to finalize batch {}", batch_id))?;
    println!("✓ Batch {} ({}) is completed", batch.id, batch.provider);

    Ok(())
}

/// Handles the main census pass
async fn handle_run(config: &Config) -> Result<()> {
    let storage = open_storage(Path::new(&config.storage.database_path))
        .context("Failed to open database")?;

    let mut coordinator = Coordinator::from_config(config, storage)
        .context("Failed to build HTTP client")?;

    match coordinator.run().await {
        Ok(RunOutcome::NoEligibleBatch) => Ok(()),
        Ok(RunOutcome::Completed { batch, counters }) => {
            tracing::info!(
                "Batch {} has no untested domains left after offset {} ({} processed this run)",
                batch.id,
                config.probe.offset,
                counters.processed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Census run failed, batch left resumable: {}", e);
            Err(e.into())
        }
    }
}
