//! Integration tests for HttpRangeClient against a local HTTP/1.1 responder.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use claypigeon_storage::{ByteRange, RangeClient, TransportError, TransportSettings};
use claypigeon_storage_http::HttpRangeClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const BODY: &[u8] = b"abcdefghij";
const LARGE_LEN: usize = 1 << 20;

/// Minimal server: one request per connection, `Connection: close`.
struct TestServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl TestServer {
    async fn start() -> Self {
        let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let requests: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
        let counter: Arc<AtomicUsize> = requests.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle(stream));
            }
        });

        Self { addr, requests }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn handle(mut stream: TcpStream) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk: [u8; 1024] = [0; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n: usize = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let request: String = String::from_utf8_lossy(&buf).into_owned();
    let mut lines = request.lines();
    let request_line: &str = lines.next().unwrap();
    let mut parts = request_line.split_whitespace();
    let method: &str = parts.next().unwrap();
    let path: &str = parts.next().unwrap();
    let range: Option<(u64, u64)> = lines
        .find_map(|l| l.to_ascii_lowercase().strip_prefix("range: bytes=").map(str::to_string))
        .and_then(|value| {
            let (s, e) = value.split_once('-')?;
            Some((s.trim().parse().ok()?, e.trim().parse().ok()?))
        });

    let response: Vec<u8> = match (method, path) {
        ("HEAD", "/data.bin") => reply("200 OK", &[], BODY.len(), b""),
        ("HEAD", "/nolength") => b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec(),
        ("GET", "/data.bin") => match range {
            Some((start, _)) if start >= BODY.len() as u64 => {
                reply("416 Range Not Satisfiable", &[], 0, b"")
            }
            Some((start, end)) => {
                let end: u64 = end.min(BODY.len() as u64 - 1);
                let slice: &[u8] = &BODY[start as usize..=end as usize];
                let content_range: String = format!("bytes {}-{}/{}", start, end, BODY.len());
                reply(
                    "206 Partial Content",
                    &[("Content-Range", content_range.as_str())],
                    slice.len(),
                    slice,
                )
            }
            None => reply("200 OK", &[], BODY.len(), BODY),
        },
        // Servers that ignore the Range header and send the whole resource.
        ("GET", "/whole.bin") => reply("200 OK", &[], BODY.len(), BODY),
        ("GET", "/large.bin") => {
            let large: Vec<u8> = vec![b'x'; LARGE_LEN];
            reply("200 OK", &[], large.len(), &large)
        }
        ("GET", "/slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            reply("200 OK", &[], 0, b"")
        }
        _ => reply("404 Not Found", &[], 0, b""),
    };

    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

/// Build a `Connection: close` response with a Content-Length header.
fn reply(status: &str, headers: &[(&str, &str)], length: usize, body: &[u8]) -> Vec<u8> {
    let mut head: String = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status, length);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("Connection: close\r\n\r\n");

    let mut out: Vec<u8> = head.into_bytes();
    out.extend_from_slice(body);
    out
}

fn client() -> HttpRangeClient {
    HttpRangeClient::new(TransportSettings::default()).unwrap()
}

#[tokio::test]
async fn test_content_length() {
    let server: TestServer = TestServer::start().await;
    let length: u64 = client().content_length(&server.url("/data.bin")).await.unwrap();
    assert_eq!(length, 10);
}

#[tokio::test]
async fn test_missing_content_length() {
    let server: TestServer = TestServer::start().await;
    let result = client().content_length(&server.url("/nolength")).await;
    assert!(matches!(result, Err(TransportError::MissingLength { .. })));
}

#[tokio::test]
async fn test_probe_not_found() {
    let server: TestServer = TestServer::start().await;
    let result = client().content_length(&server.url("/missing")).await;
    assert!(matches!(result, Err(TransportError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_get_range() {
    let server: TestServer = TestServer::start().await;
    let client: HttpRangeClient = client();
    let url: String = server.url("/data.bin");

    assert_eq!(client.get_range(&url, ByteRange::new(0, 3)).await.unwrap(), b"abcd");
    assert_eq!(client.get_range(&url, ByteRange::new(4, 7)).await.unwrap(), b"efgh");
    assert_eq!(client.get_range(&url, ByteRange::new(8, 9)).await.unwrap(), b"ij");
    assert_eq!(server.requests.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let server: TestServer = TestServer::start().await;
    let result = client()
        .get_range(&server.url("/data.bin"), ByteRange::new(20, 23))
        .await;
    match result {
        Err(TransportError::Status { status, range, .. }) => {
            assert_eq!(status, 416);
            assert_eq!(range, Some(ByteRange::new(20, 23)));
        }
        other => panic!("expected 416, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ignored_range_rejected() {
    let server: TestServer = TestServer::start().await;
    let result = client()
        .get_range(&server.url("/large.bin"), ByteRange::new(0, 3))
        .await;
    match result {
        Err(TransportError::Status { status, range, .. }) => {
            assert_eq!(status, 200);
            assert_eq!(range, Some(ByteRange::new(0, 3)));
        }
        other => panic!("expected status error, got {:?}", other.map(|b| b.len())),
    }

    let result = client()
        .get_range(&server.url("/whole.bin"), ByteRange::new(0, 3))
        .await;
    assert!(matches!(result, Err(TransportError::Status { status: 200, .. })));
}

#[tokio::test]
async fn test_ignored_range_accepted_for_whole_resource() {
    let server: TestServer = TestServer::start().await;
    let body: Vec<u8> = client()
        .get_range(&server.url("/whole.bin"), ByteRange::new(0, 9))
        .await
        .unwrap();
    assert_eq!(body, BODY);
}

#[tokio::test]
async fn test_timeout() {
    let server: TestServer = TestServer::start().await;
    let settings: TransportSettings = TransportSettings {
        request_timeout: Duration::from_millis(200),
        ..TransportSettings::default()
    };
    let client: HttpRangeClient = HttpRangeClient::new(settings).unwrap();
    let result = client.get_range(&server.url("/slow"), ByteRange::new(0, 0)).await;
    assert!(matches!(result, Err(TransportError::Timeout { .. })));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);

    let result = client().content_length(&format!("http://{}/data.bin", addr)).await;
    assert!(matches!(result, Err(TransportError::Request { .. })));
}
