//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One request the mock backend saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// A programmable mock search backend speaking just enough HTTP/1.1.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path_fragment: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.contains(path_fragment))
            .collect()
    }

    /// Poll until a request containing `path_fragment` shows up or the
    /// timeout elapses.
    pub async fn wait_for_request(&self, path_fragment: &str) -> Option<RecordedRequest> {
        for _ in 0..60 {
            if let Some(found) = self.requests_to(path_fragment).into_iter().next() {
                return Some(found);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        None
    }
}

/// Start a mock backend; `respond` maps (method, path, body) to a
/// (status, json body) reply. Requests are recorded for assertions.
pub async fn start_mock_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&str, &str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

    let backend = MockBackend {
        addr,
        requests: requests.clone(),
    };
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let requests = requests.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                loop {
                    let Some(request) = read_http_request(&mut socket).await else {
                        break;
                    };
                    requests.lock().unwrap().push(request.clone());

                    let (status, body) = respond(&request.method, &request.path, &request.body);
                    let reply = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                        status,
                        status_text(status),
                        body.len(),
                    );
                    if socket.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                    // HEAD replies carry headers only.
                    if request.method != "HEAD"
                        && socket.write_all(body.as_bytes()).await.is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    backend
}

/// Read one request off the socket: request line, headers, then a
/// Content-Length body.
async fn read_http_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let content_length = lines
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// A canned single-search response with one hit.
pub fn search_response_body() -> String {
    serde_json::json!({
        "took": 5,
        "hits": {
            "total": {"value": 1, "relation": "eq"},
            "hits": [
                {"_id": "t1", "_type": "tweet", "_source": {"user": "sam", "text": "hello"}}
            ]
        }
    })
    .to_string()
}
