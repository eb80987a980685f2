// Redis-Backed Presence Store
//
// Each key is written with a TTL equal to the online threshold, so the
// backend evicts a subject on its own once it stops refreshing. Every call
// runs under a sub-second timeout; timeouts and protocol errors surface as
// `StoreError` for the fallback gate to handle — nothing is swallowed at
// this layer.

use crate::error::StoreError;
use crate::store::PresenceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

pub struct RedisStore {
    conn: ConnectionManager,
    key_prefix: String,
    op_timeout: Duration,
}

impl RedisStore {
    pub fn new(
        conn: ConnectionManager,
        key_prefix: impl Into<String>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            op_timeout,
        }
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced(&self.key_prefix, key)
    }

    async fn with_timeout<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.op_timeout.as_millis() as u64)),
        }
    }
}

fn namespaced(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

#[async_trait]
impl PresenceStore for RedisStore {
    async fn put(
        &self,
        key: &str,
        last_seen: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        let ttl_secs = ttl.as_secs().max(1);
        self.with_timeout(async move {
            conn.set_ex::<_, _, ()>(key, last_seen.timestamp_millis(), ttl_secs)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        self.with_timeout(async move { conn.del::<_, ()>(key).await })
            .await
    }

    async fn count_by_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.namespaced(prefix));
        self.with_timeout(async move {
            let mut keys = conn.scan_match::<_, String>(pattern).await?;
            let mut count = 0usize;
            while keys.next_item().await.is_some() {
                count += 1;
            }
            Ok(count)
        })
        .await
    }
}
