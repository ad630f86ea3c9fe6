//! Content store subsystem.
//!
//! # Data Flow
//! ```text
//! Repository
//!     → ContentStore trait (scalar + ordered list primitives with expiry)
//!         → redis.rs  (deadpool pool → Redis server)
//!         → memory.rs (in-process DashMap, development and tests)
//! ```
//!
//! # Design Decisions
//! - Every write carries its own expiry; the store never holds an entry
//!   without one
//! - `append` pushes and refreshes the list expiry as one atomic unit
//! - Expired entries read back as absent, never as a distinct state
//! - Connections are scoped: acquired per operation and returned on drop

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::Result;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Key/value and ordered-list primitives with per-entry expiry.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Read the value under `key`; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Append `member` to the list under `key` and reset the list expiry to `ttl`.
    async fn append(&self, key: &str, member: &str, ttl: Duration) -> Result<()>;

    /// Every member of the list under `key`, in insertion order.
    async fn range(&self, key: &str) -> Result<Vec<String>>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Release pooled resources. Further calls fail with `StoreUnavailable`.
    async fn close(&self);
}

/// Build the store selected by `config.address`.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn ContentStore>> {
    if config.is_memory() {
        tracing::info!("Using in-memory content store");
        let store = MemoryStore::new();
        store.spawn_sweeper(Duration::from_secs(30));
        Ok(Arc::new(store))
    } else {
        Ok(Arc::new(RedisStore::connect(config).await?))
    }
}
