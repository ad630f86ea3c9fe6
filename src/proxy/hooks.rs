//! Interception points the proxy exposes to recorders.

use axum::http::{HeaderMap, Method, Request, Response, Uri};
use bytes::Bytes;

use crate::capture::SessionId;

/// Callbacks invoked around every proxied round trip.
///
/// Both run on the proxy data path and must not block on I/O.
pub trait ExchangeHooks: Send + Sync {
    /// Called with the buffered request just before it is forwarded. The hook
    /// may modify the request; returning a response answers the client
    /// directly and skips the upstream call.
    fn on_request_sent(&self, request: &mut Request<Bytes>, session: SessionId) -> Option<Response<Bytes>>;

    /// Called with the buffered upstream response before it is returned. The
    /// response carries a [`SentRequest`] extension describing what was sent.
    fn on_response_received(&self, response: &mut Response<Bytes>);
}

/// The request as it left the proxy, attached to the paired response.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl SentRequest {
    pub fn of(request: &Request<Bytes>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Hooks that record nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExchangeHooks for NoopHooks {
    fn on_request_sent(&self, _request: &mut Request<Bytes>, _session: SessionId) -> Option<Response<Bytes>> {
        None
    }

    fn on_response_received(&self, _response: &mut Response<Bytes>) {}
}
