use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::common::error::{PipelineError, Result};
use crate::common::types::{PersistedWeather, WeatherRecord};

pub mod sqlite;

/// Storage trait for persisting weather rows keyed by synthetic identity.
/// A handle is acquired per load call and released on every exit path.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Return the subset of `identities` that already have a persisted row.
    async fn query_by_identities(&self, identities: &[i64]) -> Result<Vec<i64>>;

    /// Insert all rows as one transaction: either every row commits or
    /// none do.
    async fn insert_all(&self, rows: &[(i64, WeatherRecord)]) -> Result<usize>;

    /// Fetch one persisted row by identity.
    async fn get_by_identity(&self, identity: i64) -> Result<Option<PersistedWeather>>;

    /// Number of persisted rows.
    async fn count(&self) -> Result<i64>;
}

/// In-memory store for development and testing.
pub struct InMemoryStore {
    rows: Arc<Mutex<HashMap<i64, PersistedWeather>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherStore for InMemoryStore {
    async fn query_by_identities(&self, identities: &[i64]) -> Result<Vec<i64>> {
        let rows = self.rows.lock().unwrap();
        Ok(identities
            .iter()
            .copied()
            .filter(|id| rows.contains_key(id))
            .collect())
    }

    async fn insert_all(&self, batch: &[(i64, WeatherRecord)]) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();

        // All-or-nothing: reject the whole batch before touching the map.
        for (identity, _) in batch {
            if rows.contains_key(identity) {
                return Err(PipelineError::Database {
                    message: format!("Row with identity {identity} already exists"),
                });
            }
        }

        let now = Utc::now();
        for (identity, record) in batch {
            rows.insert(
                *identity,
                PersistedWeather {
                    id: *identity,
                    record: record.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
            debug!("Inserted weather row with identity {}", identity);
        }
        Ok(batch.len())
    }

    async fn get_by_identity(&self, identity: i64) -> Result<Option<PersistedWeather>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&identity).cloned())
    }

    async fn count(&self) -> Result<i64> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.len() as i64)
    }
}
