//! The single choke point for tool invocations.
//!
//! Every `tools/call`, whichever transport it arrived on, goes through
//! [`Dispatcher::dispatch`]. Lookup, validation and handler failures all
//! come back as a [`ToolCallResponse`] with `isError` set, never as a
//! protocol error, so callers can parse them uniformly. Nothing is retried.

use crate::mcp::registry::ToolRegistry;
use crate::mcp::tools::{ToolCallResponse, ToolList};
use crate::mcp::validation::validate;
use logwise::privacy::LogIt;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Routes tool calls to the registry.
///
/// Cheap to clone; clones share the same registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    debug: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Dispatcher {
            registry,
            debug: false,
        }
    }

    /// Includes diagnostic detail (error chains, panic payloads) in tool errors.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn tool_list(&self) -> ToolList {
        self.registry.tool_list()
    }

    /// Looks up, validates and runs a tool.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use toolgate::mcp::dispatcher::Dispatcher;
    /// use toolgate::mcp::registry::ToolRegistry;
    ///
    /// let dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()));
    /// let response = dispatcher.dispatch("missing-tool", None);
    /// assert!(response.is_error());
    /// assert_eq!(response.joined_text(), "Unknown tool: missing-tool");
    /// ```
    pub fn dispatch(&self, name: &str, arguments: Option<&Value>) -> ToolCallResponse {
        let tool = match self.registry.get(name) {
            Ok(tool) => tool,
            Err(e) => {
                logwise::info_sync!("dispatch: unknown tool {name}", name = name.to_string());
                return ToolCallResponse::error(e.to_string());
            }
        };

        let schema = tool.input_schema();
        let arguments = match validate(&schema, arguments) {
            Ok(arguments) => arguments,
            Err(errors) => {
                // report the first failure; the rest are usually consequences of it
                let first = errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "Invalid arguments".to_string());
                logwise::info_sync!(
                    "dispatch: {name} rejected arguments: {error}",
                    name = name.to_string(),
                    error = first.clone()
                );
                return ToolCallResponse::error(first);
            }
        };

        match catch_unwind(AssertUnwindSafe(|| tool.call(&arguments))) {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                logwise::warn_sync!(
                    "dispatch: {name} failed: {error}",
                    name = name.to_string(),
                    error = LogIt(&error)
                );
                error.into_response(self.debug)
            }
            Err(payload) => {
                let panic_message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                logwise::error_sync!(
                    "dispatch: {name} panicked: {panic}",
                    name = name.to_string(),
                    panic = panic_message.clone()
                );
                let message = format!("Tool '{name}' failed unexpectedly");
                if self.debug {
                    ToolCallResponse::error(format!("{message}: {panic_message}"))
                } else {
                    ToolCallResponse::error(message)
                }
            }
        }
    }
}
