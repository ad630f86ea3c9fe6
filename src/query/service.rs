//! Read-side contract over the repository.
//!
//! An exchange is `RequestOnly` until its `resp-<id>` entry appears; there is
//! no pending marker, so "response not found" is an ordinary answer.

use std::collections::BTreeMap;

use crate::capture::ExchangeId;
use crate::error::Result;
use crate::repository::{ContentKey, ContentKind, ExchangeContent, IndexKey, Repository};

/// A stored half of an exchange, ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBody {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct QueryService {
    repository: Repository,
}

impl QueryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Exchange ids recorded for (key, uri, method), oldest first.
    pub async fn resolve(&self, key: &str, uri: &str, method: &str) -> Result<Vec<ExchangeId>> {
        let index = IndexKey::for_query(key, uri, method)?;
        tracing::info!(method = %index.method(), key = %key, uri = %uri, "get requests");
        self.repository.list_index(&index).await
    }

    /// Snapshot without its body.
    pub async fn fetch_metadata(&self, kind: ContentKind, id: &str) -> Result<ExchangeContent> {
        let key = ContentKey::new(kind, ExchangeId::parse(id)?);
        tracing::info!(id = %id, kind = %kind, "get meta info");
        Ok(self.repository.get_content(&key).await?.without_body())
    }

    /// Status, headers and raw body as captured.
    pub async fn fetch_body(&self, kind: ContentKind, id: &str) -> Result<StoredBody> {
        let key = ContentKey::new(kind, ExchangeId::parse(id)?);
        tracing::info!(id = %id, kind = %kind, "get body");
        let content = self.repository.get_content(&key).await?;
        Ok(StoredBody {
            status: content.status_or_default(),
            headers: content.headers,
            body: content.body.unwrap_or_default(),
        })
    }

    /// Ping the backing store.
    pub async fn health(&self) -> Result<()> {
        self.repository.store().ping().await
    }
}
