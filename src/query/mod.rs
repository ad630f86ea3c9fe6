//! Query subsystem: read access to recorded exchanges.
//!
//! # Data Flow
//! ```text
//! GET /requests?key=&uri=&method=  → service.rs resolve        → [ids]
//! GET /metadata/{id}/{type}        → service.rs fetch_metadata → snapshot without body
//! GET /body/{id}/{type}            → service.rs fetch_body     → replayed status, headers, body
//! GET /health                      → store ping
//! GET /version                     → build string
//! ```
//!
//! # Design Decisions
//! - Every failure answers with the JSON error envelope and a stable code
//! - Reads never mutate the store, so every route is idempotent

pub mod handlers;
pub mod service;

use axum::{http::StatusCode, routing::get, Router};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::QueryListenerConfig;
use self::handlers::*;

pub use service::{QueryService, StoredBody};

pub fn setup_query_router(service: QueryService, request_timeout: Duration) -> Router {
    Router::new()
        .route("/requests", get(get_requests))
        .route("/metadata/{id}/{type}", get(get_metadata))
        .route("/body/{id}/{type}", get(get_body))
        .route("/health", get(get_health))
        .route("/version", get(get_version))
        .with_state(service)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
}

/// HTTP server in front of [`QueryService`].
pub struct QueryServer {
    router: Router,
}

impl QueryServer {
    pub fn new(config: &QueryListenerConfig, service: QueryService) -> Self {
        Self {
            router: setup_query_router(service, Duration::from_secs(config.request_timeout_secs)),
        }
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "listening server");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Query server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ExchangeId;
    use crate::error::ERROR_CONTENT_TYPE;
    use crate::repository::{ContentKey, ExchangeContent, IndexKey, Repository};
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn router() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let repo = Repository::new(store.clone(), "rrp::", Duration::from_secs(60));
        let id = ExchangeId::parse("100-1").unwrap();
        repo.append_to_index(&IndexKey::new("X1", "example.com/a", "GET"), &id)
            .await
            .unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        repo.put_content(
            &ContentKey::response(&id),
            &ExchangeContent {
                id: "100-1".into(),
                timestamp: 2,
                headers,
                code: Some(201),
                body: Some(b"ok".to_vec()),
                ..Default::default()
            },
            Duration::from_secs(60),
        )
        .await
        .unwrap();
        let service = QueryService::new(repo);
        (setup_query_router(service, Duration::from_secs(5)), store)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        (status, headers, body.to_vec())
    }

    #[tokio::test]
    async fn requests_lists_ids() {
        let (router, _) = router().await;
        let (status, _, body) = get(router, "/requests?key=X1&uri=example.com/a&method=get").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(ids, vec!["100-1".to_string()]);
    }

    #[tokio::test]
    async fn requests_missing_parameter_is_bad_request() {
        let (router, _) = router().await;
        let (status, headers, body) = get(router, "/requests?key=X1&uri=example.com/a").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], ERROR_CONTENT_TYPE);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn malformed_query_string_uses_envelope() {
        let (router, _) = router().await;
        let (status, headers, body) =
            get(router, "/requests?key=a&key=b&uri=example.com/a&method=GET").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], ERROR_CONTENT_TYPE);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn undecodable_path_uses_envelope() {
        let (router, _) = router().await;
        let (status, headers, body) = get(router, "/body/%FF%FE/resp").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], ERROR_CONTENT_TYPE);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn requests_unknown_tuple_is_not_found() {
        let (router, _) = router().await;
        let (status, _, body) = get(router, "/requests?key=X2&uri=example.com/a&method=GET").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn metadata_omits_body() {
        let (router, _) = router().await;
        let (status, _, body) = get(router, "/metadata/100-1/resp").await;
        assert_eq!(status, StatusCode::OK);
        let meta: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(meta["code"], 201);
        assert!(meta.get("body").is_none());
    }

    #[tokio::test]
    async fn metadata_rejects_unknown_type() {
        let (router, _) = router().await;
        let (status, _, body) = get(router, "/metadata/100-1/foo").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["message"], "invalid input: type:[foo] not allowed");
    }

    #[tokio::test]
    async fn missing_request_half_is_not_found() {
        let (router, _) = router().await;
        let (status, _, _) = get(router, "/metadata/100-1/req").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn body_replays_capture() {
        let (router, _) = router().await;
        let (status, headers, body) = get(router.clone(), "/body/100-1/resp").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body, b"ok");

        let again = get(router, "/body/100-1/resp").await;
        assert_eq!(again.0, status);
        assert_eq!(again.2, body);
    }

    #[tokio::test]
    async fn version_is_static() {
        let (router, _) = router().await;
        let (status, _, body) = get(router, "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, VERSION.as_bytes());
        assert!(VERSION.starts_with('v'));
    }

    #[tokio::test]
    async fn health_reports_closed_store() {
        use crate::store::ContentStore;

        let (router, store) = router().await;
        let (status, _, _) = get(router.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);

        store.close().await;
        let (status, _, body) = get(router, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let envelope: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["code"], "STORE_UNAVAILABLE");
    }
}
