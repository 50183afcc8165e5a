//! JSON-RPC 2.0 envelopes.
//!
//! Both transports speak the same framing: a caller sends a [`Request`] (or a
//! [`Notification`], which carries no `id` and gets no reply) and receives a
//! [`Response`] holding either a `result` or an [`Error`].
//!
//! Incoming bytes are decoded with [`Incoming::parse`], which distinguishes
//! unparseable JSON (`-32700`) from JSON that is not a request (`-32600`).
//!
//! ```
//! use toolgate::jrpc::{Incoming, Response, Error};
//! use serde_json::json;
//!
//! let incoming = Incoming::parse(br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).unwrap();
//! let Incoming::Request(request) = incoming else { panic!("expected a request") };
//! assert_eq!(request.method, "tools/list");
//!
//! let response: Response<serde_json::Value> = Response::err(Error::method_not_found(), request.id);
//! assert_eq!(response.error.unwrap().code, -32601);
//!
//! let garbage = Incoming::parse(b"{not json");
//! assert_eq!(garbage.unwrap_err().code, -32700);
//! ```

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// A JSON-RPC 2.0 request.
///
/// Every request carries an `id` which is echoed back in the matching
/// [`Response`].
///
/// ```
/// use toolgate::jrpc::Request;
/// use serde_json::json;
///
/// let request = Request::new("tools/call".to_string(), Some(json!({"name": "file-read"})), json!(7));
/// let serialized = serde_json::to_string(&request).unwrap();
/// assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
/// ```
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Request {
    /// The JSON-RPC protocol version (must be "2.0")
    pub jsonrpc: String,
    /// The name of the method to invoke
    pub method: String,
    /// Optional parameters for the method call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Correlation identifier supplied by the caller
    pub id: serde_json::Value,
}

impl Request {
    /// Creates a new JSON-RPC 2.0 request.
    pub fn new(method: String, params: Option<serde_json::Value>, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method,
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 notification.
///
/// Notifications are one-way; the server never answers them.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    /// The JSON-RPC protocol version (must be "2.0")
    pub jsonrpc: String,
    /// The name of the method to invoke
    pub method: String,
    /// Optional parameters for the method call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    /// Creates a new JSON-RPC 2.0 notification.
    pub fn new(method: String, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method,
            params,
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A call that expects a [`Response`].
    Request(Request),
    /// A one-way message.
    Notification(Notification),
}

impl Incoming {
    /// Decodes one JSON-RPC message.
    ///
    /// Returns [`Error::parse_error`] when the bytes are not JSON at all and
    /// [`Error::invalid_request`] when the JSON is not a request object (for
    /// example when `method` is missing). Objects carrying an `id` are
    /// requests; objects without one are notifications.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|_| Error::parse_error())?;
        let has_id = match &value {
            serde_json::Value::Object(map) => map.contains_key("id"),
            _ => return Err(Error::invalid_request()),
        };
        let incoming = if has_id {
            serde_json::from_value::<Request>(value)
                .map(Incoming::Request)
                .map_err(|e| Error::invalid_request().with_data(e.to_string()))?
        } else {
            serde_json::from_value::<Notification>(value)
                .map(Incoming::Notification)
                .map_err(|e| Error::invalid_request().with_data(e.to_string()))?
        };
        let version = match &incoming {
            Incoming::Request(r) => &r.jsonrpc,
            Incoming::Notification(n) => &n.jsonrpc,
        };
        if version != "2.0" {
            return Err(Error::invalid_request().with_data("jsonrpc must be \"2.0\""));
        }
        Ok(incoming)
    }

    /// The method named by this message.
    pub fn method(&self) -> &str {
        match self {
            Incoming::Request(r) => &r.method,
            Incoming::Notification(n) => &n.method,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// Contains either a `result` or an `error`, never both.
///
/// ```
/// use toolgate::jrpc::Response;
/// use serde_json::json;
///
/// let response = Response::new(json!({"tools": []}), json!(1));
/// let json_str = serde_json::to_string(&response).unwrap();
/// assert!(!json_str.contains("\"error\""));
/// ```
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Response<R> {
    /// The JSON-RPC protocol version (must be "2.0")
    pub jsonrpc: String,
    /// The result of the method call (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    /// Error information if the method call failed (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    /// The same identifier that was in the request
    pub id: serde_json::Value,
}

impl<R> Response<R> {
    /// Creates a successful response with the given result.
    pub fn new(result: R, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Creates an error response with the given error.
    pub fn err(e: Error, id: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(e),
            id,
        }
    }

    /// Converts a typed response into a response with a `serde_json::Value` result.
    ///
    /// A result that fails to serialize becomes an internal error response
    /// rather than a panic.
    pub fn erase(self) -> Response<serde_json::Value>
    where
        R: Serialize,
    {
        match self.result.map(serde_json::to_value).transpose() {
            Ok(result) => Response {
                jsonrpc: self.jsonrpc,
                result,
                error: self.error,
                id: self.id,
            },
            Err(e) => Response::err(Error::from_error(e), self.id),
        }
    }
}

/// A JSON-RPC 2.0 error object.
///
/// # Standard Error Codes
///
/// * `-32700` - Parse error (Invalid JSON)
/// * `-32600` - Invalid Request
/// * `-32601` - Method not found
/// * `-32602` - Invalid params
/// * `-32603` - Internal error
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Error {
    /// Error code as defined in JSON-RPC 2.0 specification
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional additional information about the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Creates a new error with a custom code and message.
    pub fn new(code: i32, message: String, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    /// Attaches detail to the `data` field.
    pub fn with_data(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Creates a "Parse error" (code -32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error".to_string(), None)
    }

    /// Creates an "Invalid Request" error (code -32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request".to_string(), None)
    }

    /// Creates a "Method not found" error (code -32601).
    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found".to_string(), None)
    }

    /// Creates an "Invalid params" error (code -32602) with additional details.
    ///
    /// ```
    /// use toolgate::jrpc::Error;
    ///
    /// let error = Error::invalid_params("Missing tool name".to_string());
    /// assert_eq!(error.code, -32602);
    /// assert_eq!(error.data, Some(serde_json::Value::String("Missing tool name".to_string())));
    /// ```
    pub fn invalid_params(detail: String) -> Self {
        Self::new(-32602, "Invalid params".to_string(), Some(detail.into()))
    }

    /// Creates an "Internal error" (code -32603) from a standard Rust error.
    pub fn from_error<E: std::error::Error>(error: E) -> Self {
        Self::new(-32603, error.to_string(), None)
    }

    /// Whether this error means the envelope itself was unusable, as opposed
    /// to a well-formed request the server could not satisfy.
    pub fn is_envelope_error(&self) -> bool {
        self.code == -32700 || self.code == -32600
    }
}
