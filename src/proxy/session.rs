//! Per-connection session tokens.
//!
//! Every accepted client connection gets a fresh [`SessionId`]; requests that
//! arrive over the same keep-alive connection share it.

use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::capture::SessionId;

/// Connection info attached to every request the proxy serves.
#[derive(Debug, Clone, Copy)]
pub struct ProxySession {
    pub id: SessionId,
    pub peer: SocketAddr,
}

impl Connected<IncomingStream<'_, TcpListener>> for ProxySession {
    fn connect_info(stream: IncomingStream<'_, TcpListener>) -> Self {
        let session = Self {
            id: SessionId::next(),
            peer: *stream.remote_addr(),
        };
        tracing::trace!(session = %session.id, peer = %session.peer, "Proxy connection accepted");
        session
    }
}
