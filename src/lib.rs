// WhosOn - Online Presence Tracking Core
//
// Tracks which members and guests are currently online in a multi-request
// web service and serves a cheap aggregate count. The host calls
// `record_activity` once per inbound request and `get_stats` wherever the
// online count is rendered; backend fallback, read caching and stale-record
// sweeping are internal.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod fallback;
pub mod identity;
pub mod stats;
pub mod store;
pub mod tracker;

pub use cleanup::CleanupScheduler;
pub use config::{BackendKind, PresenceConfig};
pub use error::{ConfigError, StoreError};
pub use fallback::FallbackGate;
pub use identity::{derive_fingerprint, Identity, MemberId};
pub use stats::{AggregateStats, StatsCache};
pub use store::{MemoryStore, PresenceStore, RedisStore};
pub use tracker::PresenceTracker;
