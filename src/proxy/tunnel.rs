//! CONNECT tunnelling.
//!
//! Tunnels are spliced byte-for-byte and never recorded: the proxy does not
//! terminate TLS, so there is nothing to capture.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

/// Answer a CONNECT request and splice the upgraded connection to its target.
pub async fn connect(request: Request<Body>) -> Response {
    let Some(target) = request.uri().authority().map(|a| a.to_string()) else {
        return (StatusCode::BAD_REQUEST, "CONNECT target must be host:port").into_response();
    };

    tokio::spawn(async move {
        match hyper::upgrade::on(request).await {
            Ok(upgraded) => {
                if let Err(e) = splice(upgraded, &target).await {
                    tracing::debug!(target = %target, error = %e, "Tunnel closed with error");
                }
            }
            Err(e) => tracing::warn!(target = %target, error = %e, "CONNECT upgrade failed"),
        }
    });

    StatusCode::OK.into_response()
}

async fn splice(upgraded: Upgraded, target: &str) -> std::io::Result<()> {
    let mut upstream = TcpStream::connect(target).await?;
    let mut client = TokioIo::new(upgraded);
    let (sent, received) = tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    tracing::debug!(target = %target, sent, received, "Tunnel finished");
    Ok(())
}
