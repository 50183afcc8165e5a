/*!
A Model Context Protocol (MCP) tool server.

toolgate exposes a registry of named, schema-described tools to an AI agent
over JSON-RPC 2.0, either on standard input/output or on a stateless HTTP
endpoint guarded by a shared secret. It uses threads instead of an async
runtime.

# Request lifecycle

```text
caller -> transport decodes -> guard (HTTP only) -> dispatcher looks up the
tool and validates arguments -> tool runs -> dispatcher wraps the result ->
transport encodes the reply
```

- [`transport`]: the stdio and HTTP adapters.
- [`auth`]: the shared-secret [`Guard`](auth::Guard).
- [`mcp`]: method routing, the [`ToolRegistry`](mcp::registry::ToolRegistry),
  argument validation and the [`Dispatcher`](mcp::dispatcher::Dispatcher).
- [`capabilities`]: the built-in date, file and health-check tools.
- [`jrpc`]: JSON-RPC envelopes and error codes.

# Custom tools

```
use std::sync::Arc;
use toolgate::mcp::dispatcher::Dispatcher;
use toolgate::mcp::registry::ToolRegistry;
use toolgate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};

struct Hello;

impl Tool for Hello {
    fn name(&self) -> &str {
        "hello"
    }

    fn description(&self) -> &str {
        "Greets a user by name"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![Argument::new("name", Kind::String, "Name to greet", true)])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        Ok(ToolCallResponse::text(format!("Hello, {}!", arguments.str("name")?)))
    }
}

let mut registry = ToolRegistry::new();
registry.register(Hello).unwrap();
let dispatcher = Dispatcher::new(Arc::new(registry));

let greeting = dispatcher.dispatch("hello", Some(&serde_json::json!({"name": "Ada"})));
assert_eq!(greeting.joined_text(), "Hello, Ada!");

let missing = dispatcher.dispatch("hello", None);
assert!(missing.is_error());
```
*/

pub mod auth;
pub mod capabilities;
pub mod config;
pub mod jrpc;
pub mod mcp;
pub mod transport;

use crate::capabilities::sandbox::Sandbox;
use crate::config::{Config, TransportKind};
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::registry::{RegistryError, ToolRegistry};
use std::sync::Arc;

/// Startup and serving failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("Cannot open sandbox: {0}")]
    Sandbox(#[source] std::io::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Transport(#[from] transport::Error),
}

/// Builds the registry of built-in tools for `config`.
pub fn build_registry(config: &Config) -> Result<ToolRegistry, Error> {
    let base_dir = config.base_dir()?;
    let sandbox = Sandbox::new(&base_dir).map_err(Error::Sandbox)?;
    let mut registry = ToolRegistry::new();
    capabilities::register_all(&mut registry, Arc::new(sandbox))?;
    logwise::info_sync!(
        "toolgate: registered {count} tools, sandbox at {root}",
        count = logwise::privacy::LogIt(&registry.len()),
        root = base_dir.display().to_string()
    );
    Ok(registry)
}

/// Serves the configured transport until it stops.
pub fn serve(config: &Config) -> Result<(), Error> {
    let registry = build_registry(config)?;
    let dispatcher = Dispatcher::new(Arc::new(registry)).with_debug(config.debug);
    match config.transport {
        TransportKind::Stdio => transport::stdio::Server::new(dispatcher).run()?,
        TransportKind::Http => {
            let server = transport::http::Server::bind(
                (config.host.as_str(), config.port),
                dispatcher,
                config.guard(),
                config.limits(),
            )?;
            server.run()?
        }
    }
    Ok(())
}
