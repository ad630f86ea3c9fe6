//! Redis-backed content store over a bounded connection pool.
//!
//! # Pool policy
//! - At most `max_size` connections; acquisition waits at most `wait_timeout`
//! - Recycled connections are probed with PING before reuse
//! - A reaper evicts connections idle longer than `idle_timeout`
//! - Connections return to the pool when the guard drops, on every path

use async_trait::async_trait;
use deadpool_redis::redis;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime, Timeouts};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::error::{RecorderError, Result};
use crate::store::ContentStore;

pub struct RedisStore {
    pool: Pool,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl RedisStore {
    /// Build the pool and verify the server answers.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        tracing::info!(address = %config.address, max_size = config.max_size, "Initializing redis pool");

        let mut cfg = Config::from_url(config.address.clone());
        cfg.pool = Some(PoolConfig {
            max_size: config.max_size,
            timeouts: Timeouts {
                wait: Some(config.wait_timeout()),
                create: Some(config.connect_timeout()),
                recycle: Some(config.connect_timeout()),
            },
            ..PoolConfig::default()
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| RecorderError::StoreUnavailable(e.to_string()))?;

        let store = Self {
            pool,
            reaper: Mutex::new(None),
        };
        store.ping().await?;
        store.spawn_reaper(config.idle_timeout());
        Ok(store)
    }

    fn spawn_reaper(&self, idle_timeout: Duration) {
        let pool = self.pool.clone();
        let every = (idle_timeout / 2).max(Duration::from_secs(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let before = pool.status().size;
                let _ = pool.retain(|_, metrics| metrics.last_used() < idle_timeout);
                let status = pool.status();
                let evicted = before.saturating_sub(status.size);
                if evicted > 0 {
                    tracing::debug!(evicted, "Evicted idle store connections");
                }
                metrics::record_store_pool(status.size, status.available);
            }
        });
        if let Ok(mut slot) = self.reaper.lock() {
            *slot = Some(handle);
        }
    }

    async fn conn(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl ContentStore for RedisStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("PSETEX")
            .arg(key)
            .arg(ttl_millis(ttl))
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value.filter(|v| !v.is_empty()))
    }

    async fn append(&self, key: &str, member: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::pipe()
            .atomic()
            .cmd("RPUSH")
            .arg(key)
            .arg(member)
            .ignore()
            .cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Ok(mut slot) = self.reaper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.pool.close();
        tracing::info!("Redis pool closed");
    }
}

/// Redis rejects a zero expiry; anything shorter than a millisecond rounds up.
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}
