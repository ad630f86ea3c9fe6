//! Storage key layout.
//!
//! ```text
//! <prefix>id-<METHOD>-<correlationKey>-<uri>  → list of exchange ids
//! <prefix>req-<id> / <prefix>resp-<id>        → JSON ExchangeContent
//! ```

use std::fmt;
use std::str::FromStr;

use crate::capture::ExchangeId;
use crate::error::RecorderError;

/// Groups exchanges by (correlation key, host+path, method).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    correlation_key: String,
    uri: String,
    method: String,
}

impl IndexKey {
    /// The method is uppercased; key and uri are kept as given.
    pub fn new(
        correlation_key: impl Into<String>,
        uri: impl Into<String>,
        method: impl AsRef<str>,
    ) -> Self {
        Self {
            correlation_key: correlation_key.into(),
            uri: uri.into(),
            method: method.as_ref().to_ascii_uppercase(),
        }
    }

    /// Like [`IndexKey::new`], but every part must be non-empty.
    pub fn for_query(correlation_key: &str, uri: &str, method: &str) -> Result<Self, RecorderError> {
        if correlation_key.is_empty() || uri.is_empty() || method.is_empty() {
            return Err(RecorderError::InvalidInput(
                "'key', 'uri' or 'method' is empty".to_string(),
            ));
        }
        Ok(Self::new(correlation_key, uri, method))
    }

    pub fn correlation_key(&self) -> &str {
        &self.correlation_key
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id-{}-{}-{}", self.method, self.correlation_key, self.uri)
    }
}

/// Which half of an exchange a snapshot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Request,
    Response,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Request => "req",
            ContentKind::Response => "resp",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "req" => Ok(ContentKind::Request),
            "resp" => Ok(ContentKind::Response),
            other => Err(RecorderError::InvalidInput(format!(
                "type:[{}] not allowed",
                other
            ))),
        }
    }
}

/// Key of one request or response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    kind: ContentKind,
    id: ExchangeId,
}

impl ContentKey {
    pub fn new(kind: ContentKind, id: ExchangeId) -> Self {
        Self { kind, id }
    }

    pub fn request(id: &ExchangeId) -> Self {
        Self::new(ContentKind::Request, id.clone())
    }

    pub fn response(id: &ExchangeId) -> Self {
        Self::new(ContentKind::Response, id.clone())
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn id(&self) -> &ExchangeId {
        &self.id
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}
