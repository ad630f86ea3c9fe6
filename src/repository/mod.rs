//! Typed access to the content store.
//!
//! # Data Flow
//! ```text
//! Correlation engine / query service
//!     → Repository (typed keys, JSON snapshots, input checks)
//!     → prefixed string keys
//!     → ContentStore
//! ```
//!
//! # Design Decisions
//! - All keys share one configurable prefix
//! - An empty or expired list reads as `NotFound`, same as an absent one
//! - The repository never deletes; entries leave only through expiry

pub mod content;
pub mod keys;

use std::sync::Arc;
use std::time::Duration;

use crate::capture::ExchangeId;
use crate::error::{RecorderError, Result};
use crate::store::ContentStore;

pub use content::ExchangeContent;
pub use keys::{ContentKey, ContentKind, IndexKey};

/// Typed layer over a [`ContentStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn ContentStore>,
    prefix: String,
    ttl: Duration,
}

impl Repository {
    /// `ttl` applies to index lists; content writes pass their own.
    pub fn new(store: Arc<dyn ContentStore>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    fn key(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    /// Append `id` to the index list and refresh its expiry in one step.
    pub async fn append_to_index(&self, index: &IndexKey, id: &ExchangeId) -> Result<()> {
        self.store
            .append(&self.key(index), id.as_str(), self.ttl)
            .await
    }

    /// Every exchange id recorded under `index`, oldest first.
    pub async fn list_index(&self, index: &IndexKey) -> Result<Vec<ExchangeId>> {
        let members = self.store.range(&self.key(index)).await?;
        if members.is_empty() {
            return Err(RecorderError::NotFound(format!("no requests for {}", index)));
        }
        Ok(members.into_iter().map(ExchangeId::from).collect())
    }

    pub async fn get_content(&self, key: &ContentKey) -> Result<ExchangeContent> {
        match self.store.get(&self.key(key)).await? {
            Some(bytes) => ExchangeContent::decode(&bytes),
            None => Err(RecorderError::NotFound(format!("{} not found", key))),
        }
    }

    /// Store a snapshot, replacing any previous value under `key`.
    pub async fn put_content(
        &self,
        key: &ContentKey,
        content: &ExchangeContent,
        ttl: Duration,
    ) -> Result<()> {
        if ttl.is_zero() {
            return Err(RecorderError::InvalidInput("ttl must be greater than 0".to_string()));
        }
        let payload = content.encode()?;
        self.store.put(&self.key(key), payload, ttl).await
    }
}
