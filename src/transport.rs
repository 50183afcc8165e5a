//! Transports carrying JSON-RPC messages between a caller and the dispatcher.
//!
//! Two adapters share one contract: decode a message, obtain a result through
//! [`mcp::handle`](crate::mcp::handle), encode the reply.
//!
//! - [`stdio`]: one long-lived session over standard input/output, newline
//!   delimited. Trusted local process boundary, no authentication.
//! - [`http`]: stateless; every POST gets its own throwaway session and is
//!   checked by the [`Guard`](crate::auth::Guard).
//!
//! Neither adapter uses an async runtime. The HTTP adapter gives each
//! connection its own thread, so a slow tool only holds up its own caller.

pub mod http;
pub mod stdio;

/// Transport-level failures.
///
/// These are fatal to one HTTP connection or to the whole stdio session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Error::Io { context, source }
    }
}
