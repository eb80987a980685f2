// In-Memory Presence Store
//
// Process-local map from subject key to last-seen timestamp. There is no
// native expiry: the cleanup scheduler sweeps stale keys periodically, and
// reads filter by the online threshold so stale entries are never counted
// between sweeps.

use crate::error::StoreError;
use crate::store::PresenceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

pub struct MemoryStore {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
    online_threshold: Duration,
}

impl MemoryStore {
    pub fn new(online_threshold: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            online_threshold,
        }
    }

    /// Keys whose last activity is older than `threshold`.
    pub async fn list_stale(&self, threshold: Duration) -> Vec<String> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, last_seen)| age_of(now, last_seen) > threshold)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of tracked keys, live and stale alike.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Age of a record; a timestamp in the future counts as just seen.
fn age_of(now: DateTime<Utc>, last_seen: &DateTime<Utc>) -> Duration {
    now.signed_duration_since(*last_seen)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

#[async_trait]
impl PresenceStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        last_seen: DateTime<Utc>,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), last_seen);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn count_by_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let count = entries
            .iter()
            .filter(|(key, last_seen)| {
                key.starts_with(prefix) && age_of(now, last_seen) <= self.online_threshold
            })
            .count();
        Ok(count)
    }
}
