use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::common::error::Result;
use crate::common::types::WeatherRecord;
use crate::config::DedupPolicy;
use crate::pipeline::storage::WeatherStore;

/// Outcome of one load call: how many rows were inserted and the full
/// (not just inserted) record list that went through the loader.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub inserted: usize,
    pub message: String,
    pub records: Vec<WeatherRecord>,
}

/// Assigns synthetic identities to a record batch and inserts only the
/// identities not already persisted. At-most-once per identity within a
/// single call; never an upsert.
pub struct DedupLoader<'a> {
    store: &'a dyn WeatherStore,
    policy: DedupPolicy,
}

impl<'a> DedupLoader<'a> {
    pub fn new(store: &'a dyn WeatherStore, policy: DedupPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn load(&self, records: &[WeatherRecord]) -> Result<LoadReport> {
        let keyed = self.assign_identities(records);
        let identities: Vec<i64> = keyed.iter().map(|(id, _)| *id).collect();

        let existing = self.store.query_by_identities(&identities).await?;
        debug!(
            "Load batch of {} records, {} identities already persisted",
            records.len(),
            existing.len()
        );

        let to_insert: Vec<(i64, WeatherRecord)> = keyed
            .into_iter()
            .filter(|(id, _)| !existing.contains(id))
            .collect();

        let inserted = if to_insert.is_empty() {
            0
        } else {
            self.store.insert_all(&to_insert).await?
        };

        let message = format!("{inserted} weather records have been loaded to the database");
        info!(status = "success", message = message.as_str(), "load complete");
        Ok(LoadReport {
            inserted,
            message,
            records: records.to_vec(),
        })
    }

    /// Identity assignment. Batch position is 1-based and batch-relative:
    /// re-running with a differently-sized or -ordered batch produces
    /// different identities for the same logical records.
    fn assign_identities(&self, records: &[WeatherRecord]) -> Vec<(i64, WeatherRecord)> {
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let identity = match self.policy {
                    DedupPolicy::BatchPosition => (i + 1) as i64,
                    DedupPolicy::NaturalKey => natural_key(record),
                };
                (identity, record.clone())
            })
            .collect()
    }
}

/// Positive key from city+country+date_time, for the natural-key policy.
/// Keys are persisted, so the derivation must stay byte-for-byte stable
/// across releases: SHA-256 of the `|`-joined fields, truncated to the
/// first eight digest bytes.
fn natural_key(record: &WeatherRecord) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(record.city.as_bytes());
    hasher.update(b"|");
    hasher.update(record.country.as_bytes());
    hasher.update(b"|");
    hasher.update(record.date_time.as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) >> 1) as i64
}
