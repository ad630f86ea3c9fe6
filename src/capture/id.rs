//! Exchange and session identifiers.
//!
//! An exchange id is `<nanos>-<session>` or `<nanos>-<session>-<instance>`.
//! `nanos` is wall-clock nanoseconds forced strictly increasing within the
//! process, so two ids from one generator never collide even when the clock
//! stalls or steps backwards.

use axum::http::HeaderValue;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RecorderError;

/// Global atomic counter for session IDs.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Token identifying one client connection to the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next session token.
    pub fn next() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier shared by the request and response snapshots of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(String);

impl ExchangeId {
    /// Accept a caller-supplied id; empty ids are rejected.
    pub fn parse(raw: &str) -> Result<Self, RecorderError> {
        if raw.is_empty() {
            return Err(RecorderError::InvalidInput("empty id not allowed".to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Read an id back from a tag header value. Empty or non-text values yield `None`.
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header form of the id, for tagging forwarded requests.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl From<String> for ExchangeId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces exchange ids. Total: never fails, never blocks.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_nanos: AtomicU64,
    instance: Option<String>,
}

impl IdGenerator {
    pub fn new(instance: Option<String>) -> Self {
        Self {
            last_nanos: AtomicU64::new(0),
            instance: instance.filter(|i| !i.is_empty()),
        }
    }

    /// Resolve the configured instance setting: "" → none, "auto" → random.
    pub fn from_setting(setting: &str) -> Self {
        let instance = match setting {
            "" => None,
            "auto" => Some(uuid::Uuid::new_v4().simple().to_string()[..12].to_string()),
            other => Some(other.to_string()),
        };
        Self::new(instance)
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn next(&self, session: SessionId) -> ExchangeId {
        let nanos = self.next_nanos();
        match &self.instance {
            Some(instance) => ExchangeId(format!("{}-{}-{}", nanos, session, instance)),
            None => ExchangeId(format!("{}-{}", nanos, session)),
        }
    }

    fn next_nanos(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut last = self.last_nanos.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_nanos.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn session_ids_unique() {
        assert_ne!(SessionId::next(), SessionId::next());
    }

    #[test]
    fn id_layout() {
        let ids = IdGenerator::new(None);
        let id = ids.next(SessionId::from_raw(7));
        let (nanos, session) = id.as_str().split_once('-').unwrap();
        assert!(nanos.parse::<u64>().unwrap() > 0);
        assert_eq!(session, "7");

        let ids = IdGenerator::new(Some("node-a".into()));
        assert!(ids.next(SessionId::from_raw(7)).as_str().ends_with("-7-node-a"));
    }

    #[test]
    fn auto_instance_is_random() {
        let a = IdGenerator::from_setting("auto");
        let b = IdGenerator::from_setting("auto");
        assert_eq!(a.instance().unwrap().len(), 12);
        assert_ne!(a.instance(), b.instance());
        assert!(IdGenerator::from_setting("").instance().is_none());
    }

    #[test]
    fn never_reused_across_threads() {
        let ids = Arc::new(IdGenerator::new(None));
        let session = SessionId::from_raw(1);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..1000).map(|_| ids.next(session)).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 8000);
    }

    #[test]
    fn header_round_trip_rejects_empty() {
        let id = ExchangeId::parse("1-2").unwrap();
        assert_eq!(ExchangeId::from_header(&id.to_header_value().unwrap()), Some(id));
        assert_eq!(ExchangeId::from_header(&HeaderValue::from_static("")), None);
        assert!(ExchangeId::parse("").is_err());
    }
}
