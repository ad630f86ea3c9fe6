//! In-process content store.
//!
//! Mirrors the Redis contract closely enough to run the recorder without a
//! server: per-entry expiry, lists that refresh their expiry on append, and
//! overwrite-on-put. Each operation holds the DashMap shard lock for the key,
//! so concurrent appends to one list never lose updates.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::error::{RecorderError, Result};
use crate::store::ContentStore;

#[derive(Debug, Clone)]
enum Value {
    Scalar(Vec<u8>),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// A thread-safe store with per-entry expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    closed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodically drop expired entries so unread keys do not accumulate.
    pub fn spawn_sweeper(&self, every: Duration) {
        let entries = Arc::clone(&self.entries);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = purge(&entries);
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired entries");
                }
            }
        });
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.value().is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(RecorderError::StoreUnavailable("store is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

fn purge(entries: &DashMap<String, Entry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before.saturating_sub(entries.len())
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Scalar(value),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        let now = Instant::now();
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return Ok(None);
        }
        match &entry.value {
            Value::Scalar(bytes) => Ok(Some(bytes.clone())),
            Value::List(_) => Err(RecorderError::DecodeError(format!(
                "key '{}' holds a list",
                key
            ))),
        }
    }

    async fn append(&self, key: &str, member: &str, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(Vec::new()),
            expires_at: now + ttl,
        });
        if entry.is_expired(now) {
            entry.value = Value::List(Vec::new());
        }
        match &mut entry.value {
            Value::List(members) => members.push(member.to_string()),
            Value::Scalar(_) => {
                return Err(RecorderError::DecodeError(format!(
                    "key '{}' holds a scalar",
                    key
                )))
            }
        }
        entry.expires_at = now + ttl;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => match &entry.value {
                Value::List(members) => Ok(members.clone()),
                Value::Scalar(_) => Err(RecorderError::DecodeError(format!(
                    "key '{}' holds a scalar",
                    key
                ))),
            },
            _ => Ok(Vec::new()),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.entries.clear();
    }
}
