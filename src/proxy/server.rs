//! Forward proxy server.
//!
//! # Responsibilities
//! - Accept proxy requests (absolute-form, or origin-form with `Host`)
//! - Buffer bodies so hooks see complete requests and responses
//! - Run the exchange hooks around the upstream round trip
//! - Forward to the upstream with connect and total deadlines
//! - Tunnel CONNECT without inspection

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::capture::SessionId;
use crate::config::ProxyListenerConfig;
use crate::observability::metrics;
use crate::proxy::forward::{strip_hop_by_hop, upstream_uri};
use crate::proxy::hooks::{ExchangeHooks, SentRequest};
use crate::proxy::session::ProxySession;
use crate::proxy::tunnel;

/// State injected into the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    pub hooks: Arc<dyn ExchangeHooks>,
    pub client: Client<HttpConnector, Body>,
    pub max_body_bytes: usize,
    pub upstream_timeout: Duration,
}

/// The intercepting proxy.
pub struct ProxyServer {
    router: Router,
}

impl ProxyServer {
    pub fn new(config: &ProxyListenerConfig, hooks: Arc<dyn ExchangeHooks>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = ProxyState {
            hooks,
            client,
            max_body_bytes: config.max_body_bytes,
            upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Every request goes to the proxy handler, whatever its path.
    fn build_router(state: ProxyState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "listening proxy");

        let app = self.router.into_make_service_with_connect_info::<ProxySession>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

async fn proxy_handler(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let session = request
        .extensions()
        .get::<ConnectInfo<ProxySession>>()
        .map(|info| info.0.id)
        .unwrap_or_else(SessionId::next);

    if request.method() == Method::CONNECT {
        return tunnel::connect(request).await;
    }

    let method = request.method().clone();
    let response = forward(&state, request, session).await;
    metrics::record_proxy_request(method.as_str(), response.status().as_u16(), started);
    response
}

async fn forward(state: &ProxyState, request: Request<Body>, session: SessionId) -> Response {
    let (mut parts, body) = request.into_parts();
    parts.uri = match upstream_uri(&parts.uri, &parts.headers) {
        Ok(uri) => uri,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };
    strip_hop_by_hop(&mut parts.headers);

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(uri = %parts.uri, error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut outgoing = Request::from_parts(parts, body);
    if let Some(answer) = state.hooks.on_request_sent(&mut outgoing, session) {
        return answer.map(Body::from);
    }
    let sent = SentRequest::of(&outgoing);

    let upstream = match tokio::time::timeout(
        state.upstream_timeout,
        state.client.request(outgoing.map(Body::from)),
    )
    .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(uri = %sent.uri, error = %e, "Upstream error");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
        Err(_) => {
            tracing::error!(uri = %sent.uri, "Upstream timed out");
            return (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response();
        }
    };

    let (mut parts, body) = upstream.into_parts();
    let body = match axum::body::to_bytes(Body::new(body), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(uri = %sent.uri, error = %e, "Failed to read upstream body");
            return (StatusCode::BAD_GATEWAY, "Upstream response unreadable").into_response();
        }
    };
    strip_hop_by_hop(&mut parts.headers);

    let mut response = Response::from_parts(parts, body);
    response.extensions_mut().insert(sent);
    state.hooks.on_response_received(&mut response);
    response.map(Body::from)
}
