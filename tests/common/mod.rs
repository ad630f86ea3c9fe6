//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use request_recorder::{Recorder, RecorderConfig, RecorderHandle};

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` receives the request head (request line and headers, names
/// lowercased) and produces the `(status, body)` answer, sent with
/// `Content-Type: text/plain` and `Connection: close`.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let head = match read_request(&mut socket).await {
                    Ok(head) => head,
                    Err(_) => return,
                };
                let (status, body) = f(head).await;
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock upstream that always answers with a fixed status and body.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (status, body.to_string()) }).await
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start a recorder on ephemeral ports backed by the in-memory store.
#[allow(dead_code)]
pub async fn start_recorder() -> RecorderHandle {
    let mut config = RecorderConfig::default();
    config.proxy.bind_address = "127.0.0.1:0".into();
    config.query.bind_address = "127.0.0.1:0".into();
    config.store.address = "memory://".into();
    config.proxy.upstream_timeout_secs = 5;
    Recorder::start(config).await.unwrap()
}

/// HTTP client that sends everything through the recorder's proxy listener.
#[allow(dead_code)]
pub fn proxied_client(recorder: &RecorderHandle) -> reqwest::Client {
    let proxy = reqwest::Proxy::http(format!("http://{}", recorder.proxy_addr())).unwrap();
    reqwest::Client::builder()
        .proxy(proxy)
        .build()
        .unwrap()
}

/// Base URL of the recorder's query listener.
#[allow(dead_code)]
pub fn query_url(recorder: &RecorderHandle) -> String {
    format!("http://{}", recorder.query_addr())
}

/// Value of `name` (lowercase) in a head returned by [`read_request`].
#[allow(dead_code)]
pub fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (n, v) = line.split_once(':')?;
        (n.trim() == name).then(|| v.trim().to_string())
    })
}

/// Read one request head and its `Content-Length` body. Returns the head
/// with header names lowercased.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head: String = String::from_utf8_lossy(&buf[..head_end])
        .lines()
        .map(|line| match line.split_once(':') {
            Some((name, value)) => format!("{}:{}\n", name.to_ascii_lowercase(), value),
            None => format!("{}\n", line),
        })
        .collect();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut remaining = length.saturating_sub(buf.len() - head_end);
    while remaining > 0 {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }
    Ok(head)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
