// Stale-Record Sweeper
//
// Periodic background task that evicts stale keys from the memory store.
// Only started in memory mode; the distributed backend expires keys
// natively and needs no sweep. A failed sweep is logged and the loop
// continues on its next tick.

use crate::store::{MemoryStore, PresenceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct CleanupScheduler {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CleanupScheduler {
    /// Spawn the sweep loop. Runs until `shutdown` is called.
    pub fn start(
        store: Arc<MemoryStore>,
        interval: Duration,
        online_threshold: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; a fresh tracker has
            // nothing to sweep yet.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = sweep(&store, online_threshold).await;
                        if removed > 0 {
                            debug!(target: "whoson", removed, "swept stale presence records");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        Self { stop_tx, handle }
    }

    /// Signal the sweep loop to stop and wait for it to exit, so process
    /// shutdown does not leak a running timer.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.handle.await {
            warn!(target: "whoson", error = %err, "cleanup task did not shut down cleanly");
        }
    }
}

async fn sweep(store: &MemoryStore, threshold: Duration) -> usize {
    let stale = store.list_stale(threshold).await;
    let mut removed = 0usize;
    for key in stale {
        match store.delete(&key).await {
            Ok(()) => removed += 1,
            Err(err) => {
                warn!(target: "whoson", error = %err, "failed to evict stale record");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test]
    async fn test_sweep_removes_only_stale_keys() {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(900)));
        let stale = Utc::now() - ChronoDuration::seconds(1000);
        store
            .put("member:1", stale, Duration::from_secs(900))
            .await
            .unwrap();
        store
            .put("member:2", Utc::now(), Duration::from_secs(900))
            .await
            .unwrap();

        let removed = sweep(&store, Duration::from_secs(900)).await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_scheduler_sweeps_periodically() {
        let store = Arc::new(MemoryStore::new(Duration::from_millis(50)));
        let stale = Utc::now() - ChronoDuration::seconds(10);
        store
            .put("guest:aaaa", stale, Duration::from_millis(50))
            .await
            .unwrap();

        let scheduler = CleanupScheduler::start(
            store.clone(),
            Duration::from_millis(20),
            Duration::from_millis(50),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.is_empty().await);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_task() {
        let store = Arc::new(MemoryStore::new(Duration::from_secs(900)));
        let scheduler = CleanupScheduler::start(
            store,
            Duration::from_secs(60),
            Duration::from_secs(900),
        );
        // Must return promptly even though the first sweep is a minute out.
        scheduler.shutdown().await;
    }
}
