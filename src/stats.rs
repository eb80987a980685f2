// Aggregate Stats & Read Cache
//
// The one aggregate this subsystem serves: member count, guest count and
// their total, recomputed from live record counts and held behind a
// short-TTL cache so many unrelated requests can read it cheaply.

use crate::error::StoreError;
use crate::identity::{GUEST_KEY_PREFIX, MEMBER_KEY_PREFIX};
use crate::store::PresenceStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;

/// Aggregate online counts. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub members: usize,
    pub guests: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: AggregateStats,
    expires_at: DateTime<Utc>,
}

/// Short-TTL read-through cache in front of the aggregate-count query.
///
/// Concurrent callers arriving on a cache miss may each trigger a
/// recomputation; the entry is overwritten whole, never partially updated.
pub struct StatsCache {
    entry: RwLock<Option<CacheEntry>>,
    cache_ttl: ChronoDuration,
}

impl StatsCache {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            cache_ttl: ChronoDuration::from_std(cache_ttl).unwrap_or(ChronoDuration::MAX),
        }
    }

    /// Return the cached stats while fresh, otherwise recompute through
    /// `store` and cache the result.
    pub async fn get(&self, store: &dyn PresenceStore) -> Result<AggregateStats, StoreError> {
        let now = Utc::now();
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if now < cached.expires_at {
                    return Ok(cached.value);
                }
            }
        }

        let members = store.count_by_prefix(MEMBER_KEY_PREFIX).await?;
        let guests = store.count_by_prefix(GUEST_KEY_PREFIX).await?;
        let value = AggregateStats {
            members,
            guests,
            total: members + guests,
        };

        let mut entry = self.entry.write().await;
        *entry = Some(CacheEntry {
            value,
            expires_at: now + self.cache_ttl,
        });
        Ok(value)
    }

    /// Drop the cached value so the next read recomputes. Called on every
    /// recorded activity to keep the staleness bound tight.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}
