//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use mcp_relay::config::ProxyConfig;
use mcp_relay::http::{HttpServer, ServerError};
use mcp_relay::lifecycle::Shutdown;
use mcp_relay::observability::{PacketLogger, SharedBuffer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the mock upstream does after sending its scripted chunks.
#[derive(Clone, Copy, Debug)]
pub enum End {
    /// Close the connection (ends a close-delimited body).
    Close,
    /// Keep the connection open without sending anything else.
    Hang,
}

/// Scripted upstream response.
#[derive(Clone, Debug)]
pub struct Script {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub chunks: Vec<String>,
    pub delay: Duration,
    pub end: End,
}

impl Script {
    /// `200 OK` SSE response emitting `chunks` then closing.
    pub fn sse(chunks: &[&str]) -> Self {
        Self {
            status_line: "200 OK",
            headers: vec![("Content-Type", "text/event-stream".to_string())],
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: Duration::from_millis(10),
            end: End::Close,
        }
    }
}

/// A request as seen by the mock upstream.
#[derive(Clone, Debug)]
pub struct Captured {
    pub method_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a mock upstream replaying `script` for every connection.
///
/// Returns its `/mcp` URL and a channel of the requests it received.
pub async fn start_upstream(script: Script) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let script = script.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        serve_script(socket, script, tx).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (format!("http://{addr}/mcp"), rx)
}

async fn serve_script(mut socket: TcpStream, script: Script, tx: mpsc::UnboundedSender<Captured>) {
    let Some(captured) = read_request(&mut socket).await else {
        return;
    };
    let _ = tx.send(captured);

    let mut head = format!("HTTP/1.1 {}\r\n", script.status_line);
    for (name, value) in &script.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("Connection: close\r\n\r\n");
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    for chunk in &script.chunks {
        tokio::time::sleep(script.delay).await;
        if socket.write_all(chunk.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
    }

    match script.end {
        End::Close => {
            let _ = socket.shutdown().await;
        }
        End::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let method_line = lines.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(Captured {
        method_line,
        headers,
        body,
    })
}

/// A URL nothing is listening on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/mcp")
}

/// A relay running on an ephemeral port with an in-memory packet log.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub log: SharedBuffer,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(upstream_url: &str) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.upstream.url = upstream_url.to_string();
    config.upstream.connect_timeout_secs = 2;
    config.upstream.use_env_proxy = false;

    let log = SharedBuffer::new();
    let logger = PacketLogger::new(log.clone()).with_color(false);
    let shutdown = Shutdown::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, logger, shutdown.clone()).unwrap();
    let handle = tokio::spawn(server.run(listener));

    TestProxy {
        addr,
        log,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub const PING: &str = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
