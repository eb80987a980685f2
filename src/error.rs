// Presence Error Types
//
// Two categories: `StoreError` for transient backend failures that the
// fallback gate recovers from, and `ConfigError` for fatal construction-time
// misconfiguration.

use thiserror::Error;

/// Transient store failure (network, timeout, protocol).
///
/// Recovered automatically by the fallback gate and logged at warn level;
/// callers outside this subsystem never observe it except through
/// `get_stats` when every backend has failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or dropped the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer within the configured budget.
    #[error("store timed out after {0}ms")]
    Timeout(u64),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Fatal configuration error, surfaced when the tracker is built rather
/// than deferred to first use.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Distributed mode was forced but no client handle was supplied.
    #[error("distributed backend selected but no redis handle supplied")]
    MissingClient,

    /// A config field holds an unusable value.
    #[error("invalid config [{field}]: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
