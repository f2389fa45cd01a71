//! Statistics generation from the census database
//!
//! This module provides functionality for extracting and displaying
//! per-batch verdict counts from the storage layer.

use crate::state::DomainStatus;
use crate::storage::{BatchRecord, Storage};
use crate::CensusError;
use std::collections::HashMap;

/// Verdict counts for one batch
#[derive(Debug, Clone)]
pub struct BatchStatistics {
    /// The batch these counts belong to
    pub batch: BatchRecord,

    /// Total number of domains in the batch
    pub total_domains: u64,

    /// Count of domains by status
    pub domains_by_status: HashMap<DomainStatus, u64>,
}

impl BatchStatistics {
    /// Returns the count for a status, zero when absent
    pub fn count(&self, status: DomainStatus) -> u64 {
        self.domains_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Domains that received a terminal status
    pub fn classified(&self) -> u64 {
        self.total_domains - self.count(DomainStatus::Untested)
    }

    /// Percentage of WordPress among domains that replied
    pub fn positive_rate(&self) -> f64 {
        let positive = self.count(DomainStatus::Positive);
        let replied = positive + self.count(DomainStatus::Negative);
        if replied == 0 {
            0.0
        } else {
            (positive as f64 / replied as f64) * 100.0
        }
    }

    /// Human-readable lifecycle state of the batch
    pub fn state_label(&self) -> &'static str {
        match (self.batch.started, self.batch.completed) {
            (_, true) => "completed",
            (true, false) => "in progress",
            (false, false) => "not started",
        }
    }
}

/// Loads statistics for every batch, oldest first
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(Vec<BatchStatistics>)` - One entry per batch
/// * `Err(CensusError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<Vec<BatchStatistics>, CensusError> {
    let mut all = Vec::new();

    for batch in storage.list_batches()? {
        let total_domains = storage.count_domains(batch.id)?;

        let mut domains_by_status = HashMap::new();
        for status in DomainStatus::ALL {
            let count = storage.count_domains_by_status(batch.id, status)?;
            if count > 0 {
                domains_by_status.insert(status, count);
            }
        }

        all.push(BatchStatistics {
            batch,
            total_domains,
            domains_by_status,
        });
    }

    Ok(all)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[BatchStatistics]) {
    println!("=== Census Statistics ===\n");

    if stats.is_empty() {
        println!("No batches found");
        return;
    }

    for batch_stats in stats {
        println!(
            "Batch {} ({}, {}):",
            batch_stats.batch.id,
            batch_stats.batch.provider,
            batch_stats.state_label()
        );
        println!("  Total domains: {}", batch_stats.total_domains);

        for status in DomainStatus::ALL {
            let count = batch_stats.count(status);
            let percentage = if batch_stats.total_domains > 0 {
                (count as f64 / batch_stats.total_domains as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }

        println!(
            "  WordPress share: {:.2}% ({} / {} classified)",
            batch_stats.positive_rate(),
            batch_stats.count(DomainStatus::Positive),
            batch_stats.classified()
        );
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use chrono::Utc;

    #[test]
    fn test_load_statistics_per_batch() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.create_batch("tranco").unwrap();
        let second = storage.create_batch("majestic").unwrap();

        storage
            .insert_domains(
                first,
                &["a.test".to_string(), "b.test".to_string(), "c.test".to_string()],
            )
            .unwrap();
        storage
            .insert_domains(second, &["d.test".to_string()])
            .unwrap();
        storage.mark_batch_started(first).unwrap();

        let domains = storage.untested_domains(first, 0, 10).unwrap();
        storage
            .update_domain_status(domains[0].id, DomainStatus::Positive, Utc::now())
            .unwrap();
        storage
            .update_domain_status(domains[1].id, DomainStatus::Negative, Utc::now())
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.len(), 2);

        let first_stats = &stats[0];
        assert_eq!(first_stats.batch.id, first);
        assert_eq!(first_stats.total_domains, 3);
        assert_eq!(first_stats.count(DomainStatus::Positive), 1);
        assert_eq!(first_stats.count(DomainStatus::Negative), 1);
        assert_eq!(first_stats.count(DomainStatus::Untested), 1);
        assert_eq!(first_stats.count(DomainStatus::NoReply), 0);
        assert_eq!(first_stats.classified(), 2);
        assert!((first_stats.positive_rate() - 50.0).abs() < f64::EPSILON);
        assert_eq!(first_stats.state_label(), "in progress");

        assert_eq!(stats[1].total_domains, 1);
        assert_eq!(stats[1].state_label(), "not started");
    }

    #[test]
    fn test_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_statistics(&storage).unwrap().is_empty());
    }
}
