//! Stateless HTTP transport.
//!
//! Routes:
//!
//! | Method | Path      | Auth          | Purpose                         |
//! |--------|-----------|---------------|---------------------------------|
//! | GET    | `/health` | none          | liveness check                  |
//! | POST   | `/mcp`    | shared secret | every JSON-RPC call             |
//! | *      | other     | none          | 404 listing the two routes above |
//!
//! Every accepted connection runs on its own thread and serves exactly one
//! request (`Connection: close`). The [`Session`] built for it is dropped
//! once the response is written: there is no session id, no cookie and no
//! server-side state kept between requests, so any instance can serve any
//! request.

use crate::auth::{AuthContext, Authentication, Guard};
use crate::jrpc::{Incoming, Response};
use crate::mcp;
use crate::mcp::dispatcher::Dispatcher;
use crate::transport::Error;
use logwise::privacy::LogIt;
use serde_json::json;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The two valid routes, reported by the 404 handler.
pub const ROUTES: [&str; 2] = ["GET /health", "POST /mcp"];

const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Request-reading limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Overall deadline for receiving one whole request, counted from accept.
    /// A client trickling bytes does not extend it. `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_body_bytes: 1024 * 1024,
            read_timeout: Some(Duration::from_secs(30)),
        }
    }
}

struct Shared {
    dispatcher: Dispatcher,
    guard: Guard,
    limits: Limits,
}

/// The HTTP transport.
pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    /// Binds the listening socket. Nothing is served until [`Server::run`] or
    /// [`Server::spawn`].
    pub fn bind<A: ToSocketAddrs + std::fmt::Debug>(
        addr: A,
        dispatcher: Dispatcher,
        guard: Guard,
        limits: Limits,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(&addr).map_err(|source| Error::Bind {
            addr: format!("{addr:?}"),
            source,
        })?;
        guard.announce();
        Ok(Server {
            listener,
            shared: Arc::new(Shared {
                dispatcher,
                guard,
                limits,
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener
            .local_addr()
            .map_err(Error::io("reading the listener address"))
    }

    /// Accepts connections forever on the calling thread.
    pub fn run(self) -> Result<(), Error> {
        let addr = self.local_addr()?;
        logwise::info_sync!("http: listening on {addr}", addr = addr.to_string());
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => self.on_accept(stream, peer),
                Err(e) => {
                    // accept failures (e.g. fd exhaustion) only affect that connection
                    logwise::error_sync!("http: accept failed: {error}", error = LogIt(&e));
                }
            }
        }
    }

    /// Runs the accept loop on a background thread and returns the bound address.
    pub fn spawn(self) -> Result<SocketAddr, Error> {
        let addr = self.local_addr()?;
        std::thread::Builder::new()
            .name("toolgate-http".to_string())
            .spawn(move || {
                if let Err(e) = self.run() {
                    logwise::error_sync!("http: server stopped: {error}", error = LogIt(&e));
                }
            })
            .map_err(Error::io("spawning the accept thread"))?;
        Ok(addr)
    }

    fn on_accept(&self, stream: TcpStream, peer: SocketAddr) {
        let shared = self.shared.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("toolgate-http-{peer}"))
            .spawn(move || {
                let session = Session::new(stream, peer, shared);
                if let Err(e) = session.run() {
                    logwise::warn_sync!(
                        "http: connection {peer} failed: {error}",
                        peer = peer.to_string(),
                        error = LogIt(&e)
                    );
                }
            });
        if let Err(e) = spawned {
            logwise::error_sync!(
                "http: could not spawn a thread for {peer}: {error}",
                peer = peer.to_string(),
                error = LogIt(&e)
            );
        }
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Request target with any query string removed.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Why a request could not be read.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("Malformed request: {0}")]
    Malformed(&'static str),
    #[error("Request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Timed out waiting for the request")]
    TimedOut,
    #[error("Connection closed before the request was complete")]
    Closed,
    #[error("I/O error reading the request: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(PartialEq)]
enum ParseState {
    Method,
    Headers,
    Body(usize),
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads exactly one HTTP/1.x request from `stream`.
///
/// ```
/// use toolgate::transport::http::read_request;
///
/// let raw = b"POST /mcp?x=1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\n\r\n{}";
/// let request = read_request(&mut &raw[..], 1024).unwrap();
/// assert_eq!(request.method, "POST");
/// assert_eq!(request.path, "/mcp");
/// assert_eq!(request.header("content-length"), Some("2"));
/// assert_eq!(request.body, b"{}");
/// ```
pub fn read_request<R: Read>(stream: &mut R, max_body_bytes: usize) -> Result<HttpRequest, RequestError> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut read_buffer = [0u8; 4096];
    let mut parse_state = ParseState::Method;
    let mut method = String::new();
    let mut path = String::new();
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut head_bytes = 0usize;

    loop {
        if parse_state == ParseState::Method {
            if let Some(pos) = find(&buffer, b"\r\n") {
                let line = std::str::from_utf8(&buffer[..pos])
                    .map_err(|_| RequestError::Malformed("request line is not UTF-8"))?;
                let mut parts = line.split(' ');
                let (Some(m), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(RequestError::Malformed("bad request line"));
                };
                if !version.starts_with("HTTP/1.") || m.is_empty() {
                    return Err(RequestError::Malformed("bad request line"));
                }
                method = m.to_string();
                path = target.split('?').next().unwrap_or(target).to_string();
                head_bytes += pos + 2;
                buffer.drain(..pos + 2);
                parse_state = ParseState::Headers;
            }
        }
        if parse_state == ParseState::Headers {
            while let Some(pos) = find(&buffer, b"\r\n") {
                head_bytes += pos + 2;
                if pos == 0 {
                    buffer.drain(..2);
                    let length = match headers
                        .iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    {
                        Some((_, v)) => v
                            .parse::<usize>()
                            .map_err(|_| RequestError::Malformed("bad content-length"))?,
                        None => 0,
                    };
                    if length > max_body_bytes {
                        return Err(RequestError::TooLarge {
                            limit: max_body_bytes,
                        });
                    }
                    parse_state = ParseState::Body(length);
                    break;
                }
                let line = std::str::from_utf8(&buffer[..pos])
                    .map_err(|_| RequestError::Malformed("header is not UTF-8"))?;
                let (key, value) = line
                    .split_once(':')
                    .ok_or(RequestError::Malformed("bad header line"))?;
                headers.push((key.trim().to_string(), value.trim().to_string()));
                buffer.drain(..pos + 2);
            }
        }
        if let ParseState::Body(length) = parse_state {
            if buffer.len() >= length {
                buffer.truncate(length);
                return Ok(HttpRequest {
                    method,
                    path,
                    headers,
                    body: buffer,
                });
            }
        } else if head_bytes + buffer.len() > MAX_HEAD_BYTES {
            return Err(RequestError::Malformed("request head too large"));
        }

        match stream.read(&mut read_buffer) {
            Ok(0) => return Err(RequestError::Closed),
            Ok(n) => buffer.extend_from_slice(&read_buffer[..n]),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Err(RequestError::TimedOut);
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RequestError::Io(e)),
        }
    }
}

/// A response about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        // a Value always serializes
        let body = serde_json::to_vec(value).unwrap_or_default();
        HttpResponse {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body,
        }
    }

    pub fn empty(status: u16) -> Self {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            202 => "Accepted",
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason());
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");
        writer.write_all(head.as_bytes())?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

/// Per-request context. Lives exactly as long as one request/response cycle.
struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
}

impl Session {
    fn new(stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) -> Self {
        Session {
            stream,
            peer,
            shared,
        }
    }

    fn run(mut self) -> Result<(), Error> {
        let mut reader = DeadlineReader {
            stream: &self.stream,
            deadline: self.shared.limits.read_timeout.map(|t| Instant::now() + t),
        };
        let response = match read_request(&mut reader, self.shared.limits.max_body_bytes) {
            Ok(request) => {
                logwise::info_sync!(
                    "http: {method} {path} from {peer}",
                    method = request.method.clone(),
                    path = request.path.clone(),
                    peer = self.peer.to_string()
                );
                route(&self.shared, &request)
            }
            Err(RequestError::Closed) => return Ok(()),
            Err(RequestError::Io(source)) => {
                return Err(Error::Io {
                    context: "reading a request",
                    source,
                });
            }
            Err(e @ RequestError::TimedOut) => error_response(408, "Request Timeout", &e),
            Err(e @ RequestError::TooLarge { .. }) => error_response(413, "Payload Too Large", &e),
            Err(e @ RequestError::Malformed(_)) => error_response(400, "Bad Request", &e),
        };

        response
            .write_to(&mut self.stream)
            .map_err(Error::io("writing a response"))
    }
}

/// Reads from a socket until a fixed point in time, shrinking the socket
/// timeout before every read.
struct DeadlineReader<'a> {
    stream: &'a TcpStream,
    deadline: Option<Instant>,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            self.stream.set_read_timeout(Some(remaining))?;
        }
        let mut stream = self.stream;
        stream.read(buf)
    }
}

fn error_response(status: u16, error: &str, cause: &RequestError) -> HttpResponse {
    HttpResponse::json(status, &json!({"error": error, "message": cause.to_string()}))
}

fn route(shared: &Shared, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => health(),
        ("POST", "/mcp") => handle_mcp(shared, request),
        _ => not_found(request),
    }
}

fn health() -> HttpResponse {
    HttpResponse::json(
        200,
        &json!({
            "status": "ok",
            "message": format!("{} is running", env!("CARGO_PKG_NAME")),
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }),
    )
}

fn not_found(request: &HttpRequest) -> HttpResponse {
    HttpResponse::json(
        404,
        &json!({
            "error": "Not found",
            "message": format!(
                "No route for {} {}. Use GET /health for liveness or POST /mcp for JSON-RPC tool calls.",
                request.method, request.path
            ),
            "routes": ROUTES,
        }),
    )
}

fn handle_mcp(shared: &Shared, request: &HttpRequest) -> HttpResponse {
    let context = AuthContext::from_headers(
        request
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    if let Authentication::Denied(reason) = shared.guard.authenticate(&context) {
        logwise::warn_sync!("http: rejected /mcp call: {reason}", reason = reason);
        return HttpResponse::json(401, &json!({"error": "Unauthorized", "message": reason}))
            .with_header("WWW-Authenticate", "Bearer");
    }

    match Incoming::parse(&request.body) {
        Ok(incoming) => match mcp::handle(&shared.dispatcher, incoming) {
            Some(response) => match serde_json::to_value(&response) {
                Ok(value) => HttpResponse::json(200, &value),
                Err(e) => HttpResponse::json(
                    500,
                    &json!({"error": "Internal Server Error", "message": e.to_string()}),
                ),
            },
            None => HttpResponse::empty(202),
        },
        Err(e) => {
            let envelope: Response<serde_json::Value> = Response::err(e, serde_json::Value::Null);
            let value = serde_json::to_value(&envelope).unwrap_or_default();
            HttpResponse::json(400, &value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_split_across_reads() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let Some((&first, rest)) = self.0.split_first() else {
                    return Ok(0);
                };
                buf[0] = first;
                self.0 = rest;
                Ok(1)
            }
        }
        let raw = b"POST /mcp HTTP/1.1\r\nContent-Length: 4\r\nX-API-Key: k\r\n\r\nbody";
        let request = read_request(&mut Trickle(raw), 64).unwrap();
        assert_eq!(request.body, b"body");
        assert_eq!(request.header("x-api-key"), Some("k"));
    }

    #[test]
    fn expired_deadline_stops_reading() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        let mut reader = DeadlineReader {
            stream: &server,
            deadline: Some(Instant::now()),
        };
        let err = read_request(&mut reader, 64).unwrap_err();
        assert!(matches!(err, RequestError::TimedOut));
    }

    #[test]
    fn oversize_body_is_rejected_before_reading_it() {
        let raw = b"POST /mcp HTTP/1.1\r\nContent-Length: 999\r\n\r\n";
        let err = read_request(&mut &raw[..], 10).unwrap_err();
        assert!(matches!(err, RequestError::TooLarge { limit: 10 }));
    }

    #[test]
    fn garbage_request_line() {
        let raw = b"hello\r\n\r\n";
        let err = read_request(&mut &raw[..], 10).unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn truncated_body_means_closed() {
        let raw = b"POST /mcp HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        let err = read_request(&mut &raw[..], 100).unwrap_err();
        assert!(matches!(err, RequestError::Closed));
    }

    #[test]
    fn response_has_length_and_close() {
        let mut out = Vec::new();
        HttpResponse::empty(202).write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn health_timestamp_is_utc() {
        let response = health();
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}
