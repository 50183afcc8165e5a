//! The stdio transport driven through in-memory streams.

use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use toolgate::config::Config;
use toolgate::mcp::dispatcher::Dispatcher;
use toolgate::mcp::registry::ToolRegistry;
use toolgate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};
use toolgate::transport::stdio::Server;

struct Sleepy;

impl Tool for Sleepy {
    fn name(&self) -> &str {
        "sleepy"
    }
    fn description(&self) -> &str {
        "Sleeps before answering"
    }
    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![Argument::new("ms", Kind::Integer, "Delay", true)])
    }
    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let ms = arguments.i64("ms")?;
        thread::sleep(Duration::from_millis(ms as u64));
        Ok(ToolCallResponse::text(format!("slept {ms}")))
    }
}

fn run(dispatcher: Dispatcher, messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(|m| format!("{m}\n")).collect();
    let mut output = Vec::new();
    Server::new(dispatcher).serve(input.as_bytes(), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[test]
fn responses_keep_arrival_order() {
    let mut registry = ToolRegistry::new();
    registry.register(Sleepy).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let responses = run(
        dispatcher,
        &[
            call(1, "sleepy", json!({"ms": 200})),
            call(2, "sleepy", json!({"ms": 0})),
        ],
    );
    let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
    assert_eq!(ids, [&json!(1), &json!(2)]);
    assert_eq!(text(&responses[0]), "slept 200");
}

#[test]
fn full_session_with_builtin_tools() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::try_parse_from(["toolgate", "--base-dir", dir.path().to_str().unwrap()]).unwrap();
    let registry = toolgate::build_registry(&config).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let responses = run(
        dispatcher,
        &[
            json!({"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            call(1, "file-write", json!({"path": "hello.txt", "content": "hi there"})),
            call(2, "file-read", json!({"path": "hello.txt"})),
            call(3, "file-write", json!({"path": "hello.txt", "content": "hi there", "confirm": true})),
            call(4, "file-read", json!({"path": "hello.txt"})),
            call(5, "file-read", json!({"path": "../escape.txt"})),
            json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"}),
        ],
    );

    assert_eq!(responses.len(), 7);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "toolgate");

    let dry_run: Value = serde_json::from_str(text(&responses[1])).unwrap();
    assert_eq!(dry_run["dryRun"], true);
    assert_eq!(responses[2]["result"]["isError"], true);
    assert_eq!(text(&responses[2]), "File not found: hello.txt");

    assert_eq!(text(&responses[3]), "Wrote 8 bytes to hello.txt");
    assert_eq!(text(&responses[4]), "hi there");

    assert_eq!(responses[5]["result"]["isError"], true);
    assert!(text(&responses[5]).contains("escapes the sandbox"));

    assert_eq!(responses[6]["error"]["code"], -32601);
}

#[test]
fn validation_errors_are_tool_results() {
    let mut registry = ToolRegistry::new();
    registry.register(Sleepy).unwrap();
    let dispatcher = Dispatcher::new(Arc::new(registry));

    let responses = run(dispatcher, &[call(1, "sleepy", json!({"ms": "soon"}))]);
    assert_eq!(responses[0]["result"]["isError"], true);
    assert_eq!(
        text(&responses[0]),
        "Invalid argument 'ms': expected integer, got string"
    );
}
