//! The `health-check` tool: an HTTP GET against a URL.
//!
//! Requests go through a blocking `reqwest` client on the calling thread;
//! the timeout covers connecting and receiving the response head. Redirects
//! are followed, and the final status decides health.

use crate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::json;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT_MS: i64 = 5000;

#[derive(Debug, Clone, Copy, Default)]
pub struct HealthCheck;

impl HealthCheck {
    pub fn new() -> Self {
        HealthCheck
    }
}

impl Tool for HealthCheck {
    fn name(&self) -> &str {
        "health-check"
    }

    fn description(&self) -> &str {
        "Sends an HTTP GET to a URL and reports the status code and latency"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new("url", Kind::String, "http:// or https:// URL to check", true),
            Argument::new("timeoutMs", Kind::Integer, "Timeout in milliseconds", false)
                .with_default(DEFAULT_TIMEOUT_MS),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let raw = arguments.str("url")?;
        let timeout_ms = arguments.opt_i64("timeoutMs").unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms <= 0 {
            return Err(ToolCallError::new("timeoutMs must be positive"));
        }
        let url = Url::parse(raw)
            .map_err(|e| ToolCallError::new(format!("Invalid URL: {raw}")).with_detail(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ToolCallError::new(format!(
                "Unsupported scheme '{}': only http:// and https:// URLs are supported",
                url.scheme()
            )));
        }

        let started = Instant::now();
        let status = fetch_status(&url, Duration::from_millis(timeout_ms as u64))?;
        let latency = started.elapsed().as_millis() as u64;
        ToolCallResponse::json(&json!({
            "url": url.as_str(),
            "status": status,
            "healthy": (200..400).contains(&status),
            "latencyMs": latency,
        }))
    }
}

fn fetch_status(url: &Url, timeout: Duration) -> Result<u16, ToolCallError> {
    // checks go straight to the target, never through an environment proxy
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .no_proxy()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolCallError::new("Failed to build HTTP client").with_detail(format!("{e:?}")))?;

    let response = client.get(url.clone()).send().map_err(|e| {
        let message = if e.is_timeout() {
            format!("Timed out after {}ms: {url}", timeout.as_millis())
        } else {
            format!("Could not reach {url}")
        };
        ToolCallError::new(message).with_detail(format!("{e:?}"))
    })?;
    Ok(response.status().as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::new(map),
            _ => Arguments::new(Map::new()),
        }
    }

    fn answer_once(listener: TcpListener, reply: &'static str) -> SocketAddr {
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            stream.write_all(reply.as_bytes()).unwrap();
        });
        addr
    }

    fn serve_once(reply: &'static str) -> SocketAddr {
        answer_once(TcpListener::bind("127.0.0.1:0").unwrap(), reply)
    }

    fn report(url: String) -> Value {
        let response = HealthCheck
            .call(&args(json!({"url": url, "timeoutMs": 2000})))
            .unwrap();
        serde_json::from_str(&response.joined_text()).unwrap()
    }

    #[test]
    fn reports_status_and_health() {
        let addr = serve_once("HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n");
        let report = report(format!("http://{addr}/status"));
        assert_eq!(report["status"], 204);
        assert_eq!(report["healthy"], true);
        assert!(report["latencyMs"].is_u64());
    }

    #[test]
    fn server_errors_are_unhealthy() {
        let addr = serve_once("HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n");
        let report = report(format!("http://{addr}/"));
        assert_eq!(report["status"], 503);
        assert_eq!(report["healthy"], false);
    }

    #[test]
    fn ipv6_literal_hosts_are_reachable() {
        // hosts without IPv6 loopback cannot run this
        let Ok(listener) = TcpListener::bind("[::1]:0") else {
            return;
        };
        let addr = answer_once(listener, "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        let report = report(format!("http://[::1]:{}/", addr.port()));
        assert_eq!(report["status"], 200);
        assert_eq!(report["healthy"], true);
    }

    #[test]
    fn other_schemes_are_rejected() {
        let err = HealthCheck
            .call(&args(json!({"url": "ftp://example.com/file"})))
            .unwrap_err();
        assert!(err.message().starts_with("Unsupported scheme 'ftp'"));
    }

    #[test]
    fn refused_connection_is_a_tool_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = HealthCheck
            .call(&args(json!({"url": format!("http://{addr}/"), "timeoutMs": 500})))
            .unwrap_err();
        assert!(err.message().starts_with("Could not reach"));
    }
}
