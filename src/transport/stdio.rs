//! Newline-delimited JSON-RPC over standard input/output.
//!
//! Each line on the input is one message; each response is written as one
//! line and flushed immediately. Messages are handled strictly in arrival
//! order: the next line is not read until the previous response is written,
//! so responses always come back in request order.
//!
//! A line that is not valid JSON gets a `-32700` response with a `null` id and
//! the session carries on. A failing stream (including invalid UTF-8) ends the
//! session. Diagnostics go through logwise to stderr; stdout carries nothing
//! but protocol messages.

use crate::jrpc::{Incoming, Response};
use crate::mcp;
use crate::mcp::dispatcher::Dispatcher;
use crate::transport::Error;
use logwise::privacy::LogIt;
use std::io::{BufRead, Write};

/// The stdio transport.
#[derive(Debug, Clone)]
pub struct Server {
    dispatcher: Dispatcher,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Server { dispatcher }
    }

    /// Serves the process's stdin/stdout until end of input.
    pub fn run(&self) -> Result<(), Error> {
        logwise::info_sync!("stdio: serving on stdin/stdout");
        let stdin = std::io::stdin().lock();
        let stdout = std::io::stdout().lock();
        self.serve(stdin, stdout)
    }

    /// Serves an arbitrary reader/writer pair until the reader is exhausted.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use toolgate::mcp::{dispatcher::Dispatcher, registry::ToolRegistry};
    /// use toolgate::transport::stdio::Server;
    ///
    /// let server = Server::new(Dispatcher::new(Arc::new(ToolRegistry::new())));
    /// let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
    /// let mut output = Vec::new();
    /// server.serve(&input[..], &mut output).unwrap();
    /// assert_eq!(
    ///     String::from_utf8(output).unwrap(),
    ///     "{\"jsonrpc\":\"2.0\",\"result\":{\"tools\":[]},\"id\":1}\n"
    /// );
    /// ```
    pub fn serve<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<(), Error> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .map_err(Error::io("reading a message"))?;
            if read == 0 {
                logwise::info_sync!("stdio: end of input, closing session");
                return Ok(());
            }
            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            let response = match Incoming::parse(message.as_bytes()) {
                Ok(incoming) => mcp::handle(&self.dispatcher, incoming),
                Err(e) => {
                    logwise::warn_sync!("stdio: rejected message: {error}", error = LogIt(&e));
                    Some(Response::err(e, serde_json::Value::Null))
                }
            };

            if let Some(response) = response {
                write_message(&mut writer, &response)?;
            }
        }
    }
}

fn write_message<W: Write>(
    writer: &mut W,
    response: &Response<serde_json::Value>,
) -> Result<(), Error> {
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    writer
        .write_all(&bytes)
        .map_err(Error::io("writing a response"))?;
    writer.flush().map_err(Error::io("flushing a response"))
}
