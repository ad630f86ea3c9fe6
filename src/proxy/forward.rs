//! Request preparation for forwarding upstream.

use axum::http::{header, HeaderMap, HeaderName, Uri};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Absolute `http://` URI to send upstream.
///
/// Absolute-form targets are used as they are; origin-form targets are
/// resolved against the `Host` header.
pub fn upstream_uri(uri: &Uri, headers: &HeaderMap) -> Result<Uri, &'static str> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Ok(uri.clone());
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or("Request target has no host")?;
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    format!("http://{}{}", host, path)
        .parse()
        .map_err(|_| "Request target is not a valid URI")
}
