// Backend Fallback Gate
//
// Wraps the distributed store with the in-memory store as secondary. Every
// operation tries the primary first and retries once against memory on any
// store error, so callers never observe backend failures. The fallback is
// per-call, not sticky: a recovered backend is picked up on the very next
// call without circuit-breaker state, at the cost of one extra round-trip
// on each failing call. In pure-memory mode the gate is a passthrough.

use crate::error::StoreError;
use crate::store::{MemoryStore, PresenceStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct FallbackGate {
    primary: Option<Arc<dyn PresenceStore>>,
    secondary: Arc<MemoryStore>,
}

impl FallbackGate {
    /// Distributed-first gate with a memory secondary.
    pub fn new(primary: Arc<dyn PresenceStore>, secondary: Arc<MemoryStore>) -> Self {
        Self {
            primary: Some(primary),
            secondary,
        }
    }

    /// Pure-memory passthrough, used when no distributed backend is
    /// configured.
    pub fn memory_only(secondary: Arc<MemoryStore>) -> Self {
        Self {
            primary: None,
            secondary,
        }
    }

    pub fn is_distributed(&self) -> bool {
        self.primary.is_some()
    }

    // Keys carry subject identity, so only the operation name and the
    // error are logged.
    fn warn_fallback(operation: &str, err: &StoreError) {
        warn!(
            target: "whoson",
            operation,
            error = %err,
            "distributed store failed, falling back to memory"
        );
    }
}

#[async_trait]
impl PresenceStore for FallbackGate {
    async fn put(
        &self,
        key: &str,
        last_seen: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if let Some(primary) = &self.primary {
            match primary.put(key, last_seen, ttl).await {
                Ok(()) => return Ok(()),
                Err(err) => Self::warn_fallback("put", &err),
            }
        }
        self.secondary.put(key, last_seen, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if let Some(primary) = &self.primary {
            match primary.delete(key).await {
                Ok(()) => return Ok(()),
                Err(err) => Self::warn_fallback("delete", &err),
            }
        }
        self.secondary.delete(key).await
    }

    async fn count_by_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        if let Some(primary) = &self.primary {
            match primary.count_by_prefix(prefix).await {
                Ok(count) => return Ok(count),
                Err(err) => Self::warn_fallback("count_by_prefix", &err),
            }
        }
        self.secondary.count_by_prefix(prefix).await
    }
}
