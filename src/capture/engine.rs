//! Correlation engine: pairs requests with responses and records both.
//!
//! # Request observed
//! 1. Generate the exchange id (total, no failure mode)
//! 2. Derive the index key from (correlation header, host+path, METHOD)
//! 3. Queue the index append (append + expiry refresh, atomic in the store)
//! 4. Tag the outgoing request with the id (header + extension)
//! 5. Queue the request snapshot under `req-<id>`
//!
//! # Response observed
//! 1. Recover the id from the tag on the request that was sent; skip with a
//!    warning when it is missing
//! 2. Queue the response snapshot under `resp-<id>`
//!
//! The engine keeps no per-exchange state. Store writes go through the
//! capture queue, so recording never fails or delays the proxied exchange.

use axum::http::{HeaderName, Request, Response};
use bytes::Bytes;

use crate::capture::headers::{flatten_headers, host_and_path, now_millis};
use crate::capture::writer::{CaptureWriter, WriteJob};
use crate::capture::{ExchangeId, IdGenerator, SessionId};
use crate::observability::metrics;
use crate::proxy::hooks::{ExchangeHooks, SentRequest};
use crate::repository::{ContentKey, ExchangeContent, IndexKey};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Header carrying the caller's correlation key.
    pub key_header: HeaderName,
    /// Header the exchange id is written to on forwarded requests.
    pub tag_header: HeaderName,
    pub verbose: bool,
}

pub struct CorrelationEngine {
    ids: IdGenerator,
    writer: CaptureWriter,
    settings: EngineSettings,
}

impl CorrelationEngine {
    pub fn new(ids: IdGenerator, writer: CaptureWriter, settings: EngineSettings) -> Self {
        Self {
            ids,
            writer,
            settings,
        }
    }

    pub fn writer(&self) -> &CaptureWriter {
        &self.writer
    }

    /// Record an outgoing request and tag it with its exchange id.
    pub fn capture_request(&self, request: &mut Request<Bytes>, session: SessionId) -> ExchangeId {
        let id = self.ids.next(session);

        let uri = host_and_path(request.uri(), request.headers());
        let correlation_key = request
            .headers()
            .get(&self.settings.key_header)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        let index = IndexKey::new(correlation_key, uri, request.method().as_str());

        if self.settings.verbose {
            tracing::info!(uri = %index.uri(), key = %index.correlation_key(), id = %id, "saving request");
        } else {
            tracing::debug!(uri = %index.uri(), key = %index.correlation_key(), id = %id, "saving request");
        }

        self.writer.submit(WriteJob::AppendIndex {
            index,
            id: id.clone(),
        });

        if let Some(value) = id.to_header_value() {
            request.headers_mut().insert(self.settings.tag_header.clone(), value);
        }
        request.extensions_mut().insert(id.clone());

        let content = ExchangeContent {
            id: id.to_string(),
            timestamp: now_millis(),
            uri: Some(request.uri().to_string()),
            method: Some(request.method().to_string()),
            headers: flatten_headers(request.headers()),
            code: None,
            body: body_of(request.body()),
        };
        self.writer.submit(WriteJob::PutContent {
            key: ContentKey::request(&id),
            content,
        });

        metrics::record_capture("request");
        id
    }

    /// Record a response against the exchange its request was tagged with.
    ///
    /// Returns `None`, after logging a warning, when the tag is missing.
    pub fn capture_response(&self, response: &Response<Bytes>) -> Option<ExchangeId> {
        let Some(id) = self.recover_id(response) else {
            tracing::warn!(code = response.status().as_u16(), "response without exchange tag, not recorded");
            metrics::record_capture_skipped("missing_tag");
            return None;
        };

        if self.settings.verbose {
            tracing::info!(id = %id, code = response.status().as_u16(), "saving response");
        } else {
            tracing::debug!(id = %id, code = response.status().as_u16(), "saving response");
        }

        let content = ExchangeContent {
            id: id.to_string(),
            timestamp: now_millis(),
            uri: None,
            method: None,
            headers: flatten_headers(response.headers()),
            code: Some(response.status().as_u16()),
            body: body_of(response.body()),
        };
        self.writer.submit(WriteJob::PutContent {
            key: ContentKey::response(&id),
            content,
        });

        metrics::record_capture("response");
        Some(id)
    }

    fn recover_id(&self, response: &Response<Bytes>) -> Option<ExchangeId> {
        let sent = response.extensions().get::<SentRequest>()?;
        sent.headers
            .get(&self.settings.tag_header)
            .and_then(ExchangeId::from_header)
    }
}

fn body_of(body: &Bytes) -> Option<Vec<u8>> {
    if body.is_empty() {
        None
    } else {
        Some(body.to_vec())
    }
}

impl ExchangeHooks for CorrelationEngine {
    fn on_request_sent(&self, request: &mut Request<Bytes>, session: SessionId) -> Option<Response<Bytes>> {
        self.capture_request(request, session);
        None
    }

    fn on_response_received(&self, response: &mut Response<Bytes>) {
        self.capture_response(response);
    }
}
