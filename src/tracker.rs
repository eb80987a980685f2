// Presence Tracker
//
// The façade the host application calls: records activity once per inbound
// request, promotes guests to members on authentication, and serves the
// cached aggregate count. Activity writes are fire-and-forget — a degraded
// backend can never fail, slow, or error the surrounding request.

use crate::cleanup::CleanupScheduler;
use crate::config::{BackendKind, PresenceConfig};
use crate::error::{ConfigError, StoreError};
use crate::fallback::FallbackGate;
use crate::identity::{Identity, MemberId, GUEST_KEY_PREFIX};
use crate::stats::{AggregateStats, StatsCache};
use crate::store::{MemoryStore, PresenceStore, RedisStore};
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub struct PresenceTracker {
    gate: Arc<FallbackGate>,
    cache: Arc<StatsCache>,
    config: PresenceConfig,
    scheduler: Mutex<Option<CleanupScheduler>>,
}

impl PresenceTracker {
    /// Build a tracker. Must be called within a tokio runtime.
    ///
    /// The backend is resolved once, here: `Auto` picks the distributed
    /// store when a redis handle is supplied and memory otherwise; forcing
    /// `Distributed` without a handle is a configuration error.
    pub fn new(
        config: PresenceConfig,
        redis: Option<ConnectionManager>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let distributed: Option<Arc<dyn PresenceStore>> = match (config.backend, redis) {
            (BackendKind::Memory, _) => None,
            (BackendKind::Auto, handle) => handle.map(|conn| {
                Arc::new(RedisStore::new(
                    conn,
                    config.key_prefix.clone(),
                    config.store_timeout(),
                )) as Arc<dyn PresenceStore>
            }),
            (BackendKind::Distributed, Some(conn)) => Some(Arc::new(RedisStore::new(
                conn,
                config.key_prefix.clone(),
                config.store_timeout(),
            ))),
            (BackendKind::Distributed, None) => return Err(ConfigError::MissingClient),
        };
        Ok(Self::build(config, distributed))
    }

    /// Like `new`, but with a caller-supplied distributed store, for hosts
    /// that wrap their own key-value client.
    pub fn with_distributed_store(
        config: PresenceConfig,
        store: Arc<dyn PresenceStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, Some(store)))
    }

    fn build(config: PresenceConfig, distributed: Option<Arc<dyn PresenceStore>>) -> Self {
        let memory = Arc::new(MemoryStore::new(config.online_threshold()));
        let gate = match distributed {
            Some(primary) => FallbackGate::new(primary, memory.clone()),
            None => FallbackGate::memory_only(memory.clone()),
        };
        // In distributed mode the backend's native TTL evicts records and
        // no sweeper runs; the memory store only ever holds fallback
        // writes, which read-time threshold filtering keeps correct.
        let scheduler = if gate.is_distributed() {
            None
        } else {
            Some(CleanupScheduler::start(
                memory,
                config.cleanup_interval(),
                config.online_threshold(),
            ))
        };
        Self {
            gate: Arc::new(gate),
            cache: Arc::new(StatsCache::new(config.cache_ttl())),
            config,
            scheduler: Mutex::new(scheduler),
        }
    }

    /// Record activity for one inbound request. Fire-and-forget: the write
    /// is dispatched to the background and its result is discarded except
    /// for logging, so the caller's request path never blocks on it.
    /// Outside a tokio runtime the activity is dropped and logged rather
    /// than panicking — tracking is a side effect, never a failure.
    ///
    /// With a member id the subject is recorded as a member and any guest
    /// record left over from the same connection is removed (promotion);
    /// otherwise the connection fingerprint is recorded as a guest.
    pub fn record_activity(&self, member: Option<MemberId>, fingerprint: &str) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!(target: "whoson", "no tokio runtime on calling thread, activity dropped");
                return;
            }
        };
        let gate = self.gate.clone();
        let cache = self.cache.clone();
        let ttl = self.config.online_threshold();
        let fingerprint = fingerprint.to_string();
        runtime.spawn(async move {
            let now = Utc::now();
            let result = match member {
                Some(id) => {
                    let put = gate.put(&Identity::Member(id).key(), now, ttl).await;
                    // Best-effort promotion; an absent guest record is fine.
                    let guest_key = format!("{}{}", GUEST_KEY_PREFIX, fingerprint);
                    if let Err(err) = gate.delete(&guest_key).await {
                        debug!(target: "whoson", error = %err, "guest record cleanup failed");
                    }
                    put
                }
                None => {
                    gate.put(&Identity::Guest(fingerprint).key(), now, ttl)
                        .await
                }
            };
            match result {
                Ok(()) => cache.invalidate().await,
                // Unreachable while the memory secondary exists.
                Err(err) => {
                    error!(target: "whoson", error = %err, "presence write failed on all backends");
                }
            }
        });
    }

    /// Current aggregate counts, served through the short-TTL cache. The
    /// error arm only fires when every backend fails.
    pub async fn get_stats(&self) -> Result<AggregateStats, StoreError> {
        self.cache.get(self.gate.as_ref()).await
    }

    /// Stop the background sweeper. Idempotent, and safe to call in
    /// distributed mode where no sweeper runs.
    pub async fn shutdown(&self) {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await;
        }
    }

    /// True when the distributed backend was selected at construction.
    pub fn is_distributed(&self) -> bool {
        self.gate.is_distributed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn memory_config() -> PresenceConfig {
        PresenceConfig {
            backend: BackendKind::Memory,
            ..Default::default()
        }
    }

    // Activity writes are spawned; give them a moment to land.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_memory_mode_without_handle() {
        let tracker = PresenceTracker::new(PresenceConfig::default(), None).unwrap();
        assert!(!tracker.is_distributed());
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_distributed_mode_requires_handle() {
        let config = PresenceConfig {
            backend: BackendKind::Distributed,
            ..Default::default()
        };
        assert!(matches!(
            PresenceTracker::new(config, None),
            Err(ConfigError::MissingClient)
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = PresenceConfig {
            online_threshold_ms: 0,
            ..Default::default()
        };
        assert!(PresenceTracker::new(config, None).is_err());
    }

    #[tokio::test]
    async fn test_member_activity_counted() {
        let tracker = PresenceTracker::new(memory_config(), None).unwrap();
        tracker.record_activity(Some(MemberId(42)), "a1b2c3d4e5f6a1b2");
        settle().await;

        let stats = tracker.get_stats().await.unwrap();
        assert_eq!(stats.members, 1);
        assert_eq!(stats.guests, 0);
        assert_eq!(stats.total, 1);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_record_activity_off_runtime_is_dropped_not_panicked() {
        let tracker = Arc::new(PresenceTracker::new(memory_config(), None).unwrap());

        // A plain thread has no tokio runtime; the call must degrade to a
        // dropped write, not a panic.
        let off_runtime = tracker.clone();
        std::thread::spawn(move || {
            off_runtime.record_activity(Some(MemberId(1)), "fp");
        })
        .join()
        .expect("record_activity must not panic off-runtime");

        let stats = tracker.get_stats().await.unwrap();
        assert_eq!(stats.total, 0);
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let tracker = PresenceTracker::new(memory_config(), None).unwrap();
        tracker.shutdown().await;
        tracker.shutdown().await;
    }
}
