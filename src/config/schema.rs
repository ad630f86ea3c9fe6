//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the recorder.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the request recorder.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RecorderConfig {
    /// Intercepting proxy listener.
    pub proxy: ProxyListenerConfig,

    /// Query server listener.
    pub query: QueryListenerConfig,

    /// Backing store connection settings.
    pub store: StoreConfig,

    /// Capture behaviour (TTL, headers, write queue).
    pub capture: CaptureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Proxy listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request or response body buffered for capture.
    pub max_body_bytes: usize,

    /// Total time allowed for the upstream round trip in seconds.
    pub upstream_timeout_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ProxyListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
            upstream_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

/// Query server listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for QueryListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Backing store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `redis://host:port`, `rediss://host:port` or `memory://`.
    pub address: String,

    /// Prefix prepended to every key.
    pub key_prefix: String,

    /// Maximum pooled connections.
    pub max_size: usize,

    /// Idle connections older than this are evicted.
    pub idle_timeout_secs: u64,

    /// Longest wait for a pooled connection in milliseconds.
    pub wait_timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "rrp::".to_string(),
            max_size: 10,
            idle_timeout_secs: 240,
            wait_timeout_ms: 500,
            connect_timeout_ms: 1000,
        }
    }
}

impl StoreConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// True when the in-process store is selected.
    pub fn is_memory(&self) -> bool {
        self.address.starts_with("memory:")
    }
}

/// Capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Expiry for every index list and content entry, in seconds.
    pub ttl_secs: u64,

    /// Request header holding the caller-supplied correlation key.
    pub key_header: String,

    /// Header used to tag forwarded requests with their exchange ID.
    pub tag_header: String,

    /// Log every capture at info level.
    pub verbose: bool,

    /// Per-instance suffix for exchange IDs. Empty disables it, "auto"
    /// picks a random one at startup.
    pub instance_id: String,

    /// Bounded write queue capacity.
    pub queue_capacity: usize,

    /// Concurrent store writes.
    pub workers: usize,

    /// Deadline for a single store write attempt in milliseconds.
    pub write_timeout_ms: u64,

    /// Attempts per write, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// How long shutdown waits for queued writes in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 2 * 60 * 60,
            key_header: "X-tid".to_string(),
            tag_header: "X-proxy-req-id".to_string(),
            verbose: false,
            instance_id: String::new(),
            queue_capacity: 10_000,
            workers: 32,
            write_timeout_ms: 1000,
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 1000,
            drain_timeout_secs: 10,
        }
    }
}

impl CaptureConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recorded_options() {
        let config = RecorderConfig::default();
        assert_eq!(config.capture.ttl_secs, 7200);
        assert_eq!(config.capture.key_header, "X-tid");
        assert_eq!(config.store.max_size, 10);
        assert!(!config.capture.verbose);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RecorderConfig = toml::from_str(
            r#"
            [capture]
            ttl_secs = 60

            [store]
            address = "memory://"
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.ttl(), Duration::from_secs(60));
        assert_eq!(config.capture.key_header, "X-tid");
        assert!(config.store.is_memory());
        assert_eq!(config.proxy.bind_address, "0.0.0.0:8080");
    }
}
