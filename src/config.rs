// Presence Configuration
//
// All fields are optional in serialized form and fall back to the defaults
// below, so a host can configure the subsystem from a partial config table.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default online threshold: 15 minutes.
pub const DEFAULT_ONLINE_THRESHOLD_MS: u64 = 900_000;
/// Default memory-store sweep cadence: 1 minute.
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;
/// Default stats cache freshness bound: 5 seconds.
pub const DEFAULT_CACHE_TTL_MS: u64 = 5_000;
/// Default per-call budget for distributed store operations.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 500;
/// Default key namespace for distributed keys.
pub const DEFAULT_KEY_PREFIX: &str = "online:";

/// Backend selection, resolved once when the tracker is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Distributed when a redis handle is supplied, memory otherwise.
    #[default]
    Auto,
    /// Process-local map, swept by the cleanup scheduler.
    Memory,
    /// Shared redis backend with native per-key TTL.
    Distributed,
}

/// Presence subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Window beyond which a record is considered offline (milliseconds)
    #[serde(default = "default_online_threshold")]
    pub online_threshold_ms: u64,

    /// Memory-store sweep cadence (milliseconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ms: u64,

    /// Stats cache freshness bound (milliseconds)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ms: u64,

    /// Per-call timeout for distributed store operations (milliseconds)
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Namespace prefix for distributed keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Backend selection
    #[serde(default)]
    pub backend: BackendKind,
}

fn default_online_threshold() -> u64 {
    DEFAULT_ONLINE_THRESHOLD_MS
}

fn default_cleanup_interval() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_MS
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_store_timeout() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_threshold_ms: DEFAULT_ONLINE_THRESHOLD_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            backend: BackendKind::Auto,
        }
    }
}

impl PresenceConfig {
    /// Validate the configuration. Called by the tracker constructor so a
    /// bad config fails at startup, not on first use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.online_threshold_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "online_threshold_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.cleanup_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "key_prefix",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn online_threshold(&self) -> Duration {
        Duration::from_millis(self.online_threshold_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PresenceConfig::default();
        assert_eq!(config.online_threshold_ms, 900_000);
        assert_eq!(config.cleanup_interval_ms, 60_000);
        assert_eq!(config.cache_ttl_ms, 5_000);
        assert_eq!(config.store_timeout_ms, 500);
        assert_eq!(config.key_prefix, "online:");
        assert_eq!(config.backend, BackendKind::Auto);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_deserialization() {
        let config: PresenceConfig =
            serde_json::from_str(r#"{ "online_threshold_ms": 60000, "backend": "memory" }"#)
                .unwrap();
        assert_eq!(config.online_threshold_ms, 60_000);
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.cache_ttl_ms, DEFAULT_CACHE_TTL_MS);
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
    }

    #[test]
    fn test_config_rejects_zero_threshold() {
        let config = PresenceConfig {
            online_threshold_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_store_timeout() {
        let config = PresenceConfig {
            store_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_cache_ttl() {
        let config = PresenceConfig {
            cache_ttl_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_key_prefix() {
        let config = PresenceConfig {
            key_prefix: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
