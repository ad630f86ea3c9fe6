use axum::{
    body::Body,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::{RecorderError, Result};
use crate::observability::metrics;
use crate::query::service::{QueryService, StoredBody};
use crate::repository::ContentKind;

/// Build string served by `/version`.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Framing headers recomputed from the replayed bytes.
const FRAMING: [&str; 2] = ["content-length", "transfer-encoding"];

#[derive(Debug, Default, Deserialize)]
pub struct RequestsParams {
    pub key: Option<String>,
    pub uri: Option<String>,
    pub method: Option<String>,
}

fn finish(route: &'static str, result: Result<Response>) -> Response {
    let response = result.unwrap_or_else(|e| {
        tracing::debug!(route, code = e.code(), error = %e, "Query failed");
        e.into_response()
    });
    metrics::record_query(route, response.status().as_u16());
    response
}

pub async fn get_requests(
    State(service): State<QueryService>,
    params: std::result::Result<Query<RequestsParams>, QueryRejection>,
) -> Response {
    let result = match params {
        Ok(Query(params)) => requests(&service, params).await,
        Err(rejection) => Err(RecorderError::InvalidInput(rejection.body_text())),
    };
    finish("requests", result)
}

pub async fn get_metadata(
    State(service): State<QueryService>,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
) -> Response {
    let result = match path {
        Ok(Path((id, kind))) => metadata(&service, &id, &kind).await,
        Err(rejection) => Err(RecorderError::InvalidInput(rejection.body_text())),
    };
    finish("metadata", result)
}

pub async fn get_body(
    State(service): State<QueryService>,
    path: std::result::Result<Path<(String, String)>, PathRejection>,
) -> Response {
    let result = match path {
        Ok(Path((id, kind))) => body(&service, &id, &kind).await,
        Err(rejection) => Err(RecorderError::InvalidInput(rejection.body_text())),
    };
    finish("body", result)
}

async fn requests(service: &QueryService, params: RequestsParams) -> Result<Response> {
    let key = params.key.unwrap_or_default();
    let uri = params.uri.unwrap_or_default();
    let method = params.method.unwrap_or_default();
    let ids: Vec<String> = service
        .resolve(&key, &uri, &method)
        .await?
        .into_iter()
        .map(|id| id.as_str().to_string())
        .collect();
    Ok(Json(ids).into_response())
}

async fn metadata(service: &QueryService, id: &str, kind: &str) -> Result<Response> {
    let kind: ContentKind = kind.parse()?;
    let content = service.fetch_metadata(kind, id).await?;
    Ok(Json(content).into_response())
}

async fn body(service: &QueryService, id: &str, kind: &str) -> Result<Response> {
    let kind: ContentKind = kind.parse()?;
    replay(service.fetch_body(kind, id).await?)
}

pub async fn get_version() -> &'static str {
    metrics::record_query("version", StatusCode::OK.as_u16());
    VERSION
}

pub async fn get_health(State(service): State<QueryService>) -> Response {
    let result = service
        .health()
        .await
        .map(|()| Json(serde_json::json!({ "status": "ok" })).into_response());
    finish("health", result)
}

/// Rebuild the captured message. Headers that no longer form a valid
/// name/value pair are dropped.
fn replay(stored: StoredBody) -> Result<Response> {
    let status = StatusCode::from_u16(stored.status).map_err(|_| {
        RecorderError::DecodeError(format!("stored status code {} is invalid", stored.status))
    })?;

    let mut response = Response::new(Body::from(stored.body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in &stored.headers {
        if FRAMING.contains(&name.as_str()) {
            continue;
        }
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping unreplayable header"),
        }
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn replay_restores_status_and_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        headers.insert("content-length".to_string(), "999".to_string());
        headers.insert("bad header".to_string(), "x".to_string());

        let response = replay(StoredBody {
            status: 201,
            headers,
            body: b"ok".to_vec(),
        })
        .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert!(response.headers().get("content-length").is_none());
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn replay_rejects_impossible_status() {
        let err = replay(StoredBody {
            status: 1000,
            headers: BTreeMap::new(),
            body: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, RecorderError::DecodeError(_)));
    }
}
