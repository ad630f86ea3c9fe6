//! Request/response field extraction for snapshots.

use axum::http::{header, HeaderMap, Uri};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Flatten headers to one value per name.
///
/// Lossy: when a header repeats, only its first value is kept. Names are the
/// lowercase form the `http` crate normalizes to. Non-UTF-8 values are
/// converted lossily.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            flat.insert(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }
    flat
}

/// `host[:port]/path` of a request, the uri component of index keys.
///
/// Uses the authority of absolute-form targets, falling back to the `Host`
/// header for origin-form ones. Query strings are not part of it.
pub fn host_and_path(uri: &Uri, headers: &HeaderMap) -> String {
    let host = match uri.authority() {
        Some(authority) => match authority.port() {
            Some(port) => format!("{}:{}", authority.host(), port),
            None => authority.host().to_string(),
        },
        None => headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };
    format!("{}{}", host, uri.path())
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
