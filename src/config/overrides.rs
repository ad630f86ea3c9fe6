//! Command-line overrides layered on top of the file configuration.
//!
//! Accepts the short forms operators are used to: a bare port for the
//! listeners (`8080`) and a bare `host:port` for the store.

use crate::config::schema::RecorderConfig;

/// Values supplied on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub proxy_addr: Option<String>,
    pub server_addr: Option<String>,
    pub store_addr: Option<String>,
    pub ttl_secs: Option<u64>,
    pub key_header: Option<String>,
    pub verbose: bool,
    pub instance_id: Option<String>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut RecorderConfig) {
        if let Some(addr) = &self.proxy_addr {
            config.proxy.bind_address = listen_address(addr);
        }
        if let Some(addr) = &self.server_addr {
            config.query.bind_address = listen_address(addr);
        }
        if let Some(addr) = &self.store_addr {
            config.store.address = store_address(addr);
        }
        if let Some(ttl) = self.ttl_secs {
            config.capture.ttl_secs = ttl;
        }
        if let Some(key) = &self.key_header {
            config.capture.key_header = key.clone();
        }
        if self.verbose {
            config.capture.verbose = true;
        }
        if let Some(instance) = &self.instance_id {
            config.capture.instance_id = instance.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// `8080` → `0.0.0.0:8080`; `:8080` → `0.0.0.0:8080`; full addresses pass through.
pub fn listen_address(value: &str) -> String {
    let port = value.strip_prefix(':').unwrap_or(value);
    if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
        format!("0.0.0.0:{}", port)
    } else {
        value.to_string()
    }
}

/// `localhost:6379` → `redis://localhost:6379`; `memory` → `memory://`.
pub fn store_address(value: &str) -> String {
    if value.contains("://") {
        value.to_string()
    } else if value == "memory" {
        "memory://".to_string()
    } else {
        format!("redis://{}", value)
    }
}
