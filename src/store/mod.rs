// Presence Store Contract
//
// Key-value store abstraction with per-key expiry, implemented by the
// in-memory map, the redis backend, and the fallback gate that composes
// the two.

pub mod memory;
pub mod redis;

pub use self::redis::RedisStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Store for presence records, safe for concurrent callers.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Upsert the last-seen timestamp for a key. Last call wins; recency
    /// is approximate by design, so no wall-clock comparison is made.
    async fn put(
        &self,
        key: &str,
        last_seen: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Count keys under a prefix that are still within the online window.
    async fn count_by_prefix(&self, prefix: &str) -> Result<usize, StoreError>;
}
