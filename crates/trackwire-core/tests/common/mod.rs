//! Shared utilities for integration testing: tiny raw-TCP mock backends.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Initialize the tracing subscriber for test debugging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=trackwire_core=debug).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// One parsed inbound HTTP request.
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub head: String,
    pub body: String,
}

impl MockRequest {
    /// The bearer token from the Authorization header, if any.
    pub fn bearer(&self) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if !name.eq_ignore_ascii_case("authorization") {
                return None;
            }
            value.trim().strip_prefix("Bearer ").map(str::to_string)
        })
    }
}

/// Start a programmable mock API backend on an ephemeral port.
///
/// The handler maps each parsed request to `(status, json_body)`.
pub async fn start_api_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(&MockRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let (status, body) = handler(&request);
                            let response = format!(
                                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status_line(status),
                                body.len(),
                                body
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Handle to a mock server-push backend.
pub struct SseBackend {
    pub addr: SocketAddr,
    /// Number of connections accepted so far.
    pub accepts: Arc<AtomicU32>,
    /// Request heads seen, in arrival order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

/// Start a mock event-stream backend that serves the given pre-formatted
/// SSE frames to every connection. With `hold_open` the connection then
/// stays up; without it the server closes after the last frame.
pub async fn start_sse_backend(frames: Vec<String>, hold_open: bool) -> SseBackend {
    start_sse_backend_inner(frames, Some(hold_open)).await
}

/// Start a mock event-stream backend that reads each request and then drops
/// the connection without responding, simulating a flaky transport.
pub async fn start_flaky_sse_backend() -> SseBackend {
    start_sse_backend_inner(Vec::new(), None).await
}

async fn start_sse_backend_inner(frames: Vec<String>, serve: Option<bool>) -> SseBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicU32::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let accepts_counter = accepts.clone();
    let request_log = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    accepts_counter.fetch_add(1, Ordering::SeqCst);
                    let frames = frames.clone();
                    let request_log = request_log.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        request_log.lock().unwrap().push(request.head);
                        let Some(hold_open) = serve else {
                            // Drop without a response
                            return;
                        };

                        let header =
                            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\n\r\n";
                        if socket.write_all(header.as_bytes()).await.is_err() {
                            return;
                        }
                        for frame in &frames {
                            if socket.write_all(frame.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        if hold_open {
                            // Hold the stream open until the client goes away
                            tokio::time::sleep(Duration::from_secs(60)).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    SseBackend {
        addr,
        accepts,
        requests,
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let body_end = (body_start + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();

    Some(MockRequest {
        method,
        path,
        head,
        body,
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Poll `check` until it passes or the deadline expires.
pub async fn wait_until<F>(deadline: Duration, mut check: F)
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition not met within {:?}", deadline);
}
