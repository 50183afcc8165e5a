//! Model Context Protocol method handling.
//!
//! [`handle`] maps a decoded JSON-RPC message onto the MCP methods this
//! server implements (`initialize`, `ping`, `tools/list`, `tools/call`).
//! Both transports call it; neither knows about individual methods.
//!
//! Tool-level failures travel inside the `tools/call` result (`isError`);
//! only malformed calls produce JSON-RPC errors.

use crate::jrpc::{Error, Incoming, Request, Response};
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::tools::{ToolCallParams, ToolCallResponse, ToolList};
use std::collections::HashMap;

pub mod dispatcher;
pub mod registry;
pub mod tools;
pub mod validation;

/// MCP revision this server speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Handles one inbound message.
///
/// Returns `None` for notifications, which never get a reply.
///
/// ```
/// use std::sync::Arc;
/// use toolgate::jrpc::Incoming;
/// use toolgate::mcp::{dispatcher::Dispatcher, handle, registry::ToolRegistry};
///
/// let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()));
/// let ping = Incoming::parse(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
/// let response = handle(&dispatcher, ping).unwrap();
/// assert_eq!(response.result, Some(serde_json::json!({})));
///
/// let initialized = Incoming::parse(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
/// assert!(handle(&dispatcher, initialized).is_none());
/// ```
pub fn handle(dispatcher: &Dispatcher, incoming: Incoming) -> Option<Response<serde_json::Value>> {
    match incoming {
        Incoming::Request(request) => Some(handle_request(dispatcher, request)),
        Incoming::Notification(notification) => {
            logwise::info_sync!(
                "mcp: notification {method}",
                method = notification.method.clone()
            );
            None
        }
    }
}

/// Handles one request.
pub fn handle_request(dispatcher: &Dispatcher, request: Request) -> Response<serde_json::Value> {
    match request.method.as_str() {
        "initialize" => initialize(request).erase(),
        "ping" => Response::new(serde_json::json!({}), request.id),
        "tools/list" => list(dispatcher, request).erase(),
        "tools/call" => call(dispatcher, request).erase(),
        _ => Response::err(Error::method_not_found(), request.id),
    }
}

fn list(dispatcher: &Dispatcher, request: Request) -> Response<ToolList> {
    Response::new(dispatcher.tool_list(), request.id)
}

fn call(dispatcher: &Dispatcher, request: Request) -> Response<ToolCallResponse> {
    let params = match request.params {
        Some(params) => match serde_json::from_value::<ToolCallParams>(params) {
            Ok(params) => params,
            Err(err) => return Response::err(Error::invalid_params(err.to_string()), request.id),
        },
        None => {
            return Response::err(
                Error::invalid_params("No parameters provided".to_string()),
                request.id,
            );
        }
    };
    let response = dispatcher.dispatch(&params.name, params.arguments.as_ref());
    Response::new(response, request.id)
}

fn initialize(request: Request) -> Response<InitializeResult> {
    Response::new(InitializeResult::new(), request.id)
}

#[derive(Debug, serde::Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    capabilities: HashMap<String, HashMap<String, serde_json::Value>>,
    #[serde(rename = "serverInfo")]
    server_info: HashMap<String, serde_json::Value>,
}

impl InitializeResult {
    fn new() -> Self {
        let mut server_info = HashMap::new();
        server_info.insert("name".to_string(), env!("CARGO_PKG_NAME").into());
        server_info.insert("version".to_string(), env!("CARGO_PKG_VERSION").into());

        let mut capabilities = HashMap::new();
        let mut tool_capabilities = HashMap::new();
        // the registry is fixed at startup
        tool_capabilities.insert("listChanged".to_string(), false.into());
        capabilities.insert("tools".to_string(), tool_capabilities);
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities,
            server_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::registry::ToolRegistry;
    use crate::mcp::tools::{Arguments, InputSchema, Tool, ToolCallError};
    use serde_json::json;
    use std::sync::Arc;

    struct Constant;

    impl Tool for Constant {
        fn name(&self) -> &str {
            "constant"
        }
        fn description(&self) -> &str {
            "Always answers 42"
        }
        fn input_schema(&self) -> InputSchema {
            InputSchema::new(vec![])
        }
        fn call(&self, _: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
            Ok(ToolCallResponse::text("42"))
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Constant).unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    fn request(method: &str, params: Option<serde_json::Value>) -> Request {
        Request::new(method.to_string(), params, json!(9))
    }

    #[test]
    fn initialize_advertises_tools() {
        let response = handle_request(&dispatcher(), request("initialize", None));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "toolgate");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn list_is_stable() {
        let d = dispatcher();
        let first = handle_request(&d, request("tools/list", None));
        let second = handle_request(&d, request("tools/list", None));
        assert_eq!(first.result, second.result);
        assert_eq!(first.result.unwrap()["tools"][0]["name"], "constant");
    }

    #[test]
    fn call_wraps_tool_result() {
        let response = handle_request(
            &dispatcher(),
            request("tools/call", Some(json!({"name": "constant"}))),
        );
        assert_eq!(response.id, json!(9));
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "42");
        assert_eq!(result["isError"], false);
    }

    #[test]
    fn call_unknown_tool_is_not_a_protocol_error() {
        let response = handle_request(
            &dispatcher(),
            request("tools/call", Some(json!({"name": "nope", "arguments": {}}))),
        );
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["isError"], true);
    }

    #[test]
    fn call_without_params_is_invalid_params() {
        let response = handle_request(&dispatcher(), request("tools/call", None));
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn call_without_name_is_invalid_params() {
        let response = handle_request(
            &dispatcher(),
            request("tools/call", Some(json!({"arguments": {}}))),
        );
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn unknown_method() {
        let response = handle_request(&dispatcher(), request("resources/list", None));
        assert_eq!(response.error.unwrap().code, -32601);
    }
}
