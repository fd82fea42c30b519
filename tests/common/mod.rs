//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use malinger::config::ServerConfig;
use malinger::http::HttpServer;
use malinger::lifecycle::Shutdown;
use malinger::net::Listener;
use malinger::relay::ExchangeTracker;

/// A request as the mock upstream saw it on the wire.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock upstream writes back, byte for byte.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub head: String,
    pub body: Vec<u8>,
    /// Pause before anything is written.
    pub before_head: Duration,
    /// Pause between the head and the body.
    pub before_body: Duration,
}

impl MockReply {
    /// `200 OK` with the given body, `Content-Length` and `Connection` only.
    pub fn ok(body: &str) -> Self {
        Self::raw(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            ),
            body,
        )
    }

    pub fn raw(head: String, body: &str) -> Self {
        Self {
            head,
            body: body.as_bytes().to_vec(),
            before_head: Duration::ZERO,
            before_body: Duration::ZERO,
        }
    }

    pub fn after(mut self, pause: Duration) -> Self {
        self.before_head = pause;
        self
    }

    pub fn body_after(mut self, pause: Duration) -> Self {
        self.before_body = pause;
        self
    }
}

/// Start a mock upstream on an ephemeral port.
///
/// `f` is called once per request with what was received and decides the
/// reply. Every connection is closed after one exchange.
pub async fn start_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(seen) = read_request(&mut socket).await else {
                    return;
                };
                let reply = f(seen).await;

                tokio::time::sleep(reply.before_head).await;
                if socket.write_all(reply.head.as_bytes()).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(reply.before_body).await;
                let _ = socket.write_all(&reply.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock upstream that always answers `200 OK` with `body`.
pub async fn start_fixed_upstream(body: &'static str) -> SocketAddr {
    start_upstream(move |_| async move { MockReply::ok(body) }).await
}

/// Mock upstream that reads the request and never answers.
///
/// Reports the instant each connection was closed by the other side.
pub async fn start_silent_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<Instant>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_none() {
                    return;
                }
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                let _ = closed_tx.send(Instant::now());
            });
        }
    });

    (addr, closed_rx)
}

/// Plain TCP endpoint that records the first byte each connection sends.
///
/// A TLS client opens with a handshake record (`0x16`); the connection is
/// closed right after, so the handshake never completes.
pub async fn start_first_byte_recorder() -> (SocketAddr, mpsc::UnboundedReceiver<u8>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (first_tx, first_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut first = [0u8; 1];
            if socket.read_exact(&mut first).await.is_ok() {
                let _ = first_tx.send(first[0]);
            }
        }
    });

    (addr, first_rx)
}

async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest {
        request_line,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Proxy configuration pointing at `upstream` with the given delay.
pub fn proxy_config(upstream: SocketAddr, delay_seconds: f64) -> ServerConfig {
    ServerConfig {
        remote_host: upstream.to_string(),
        delay_seconds,
        ..ServerConfig::default()
    }
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub tracker: ExchangeTracker,
    pub task: tokio::task::JoinHandle<()>,
}

/// Start the proxy on an ephemeral loopback port.
pub async fn start_proxy(config: ServerConfig) -> RunningProxy {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    start_proxy_on(Listener::plain(tcp), config)
}

/// Start the proxy on an already bound listener, plain or TLS.
pub fn start_proxy_on(listener: Listener, config: ServerConfig) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    let tracker = server.tracker();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let task = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningProxy {
        addr,
        shutdown,
        tracker,
        task,
    }
}

/// Client that never pools, so every request is its own connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
