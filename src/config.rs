//! Command-line and environment configuration.
//!
//! Every flag falls back to a `TOOLGATE_*` environment variable, then to a
//! default.

use crate::auth::Guard;
use crate::transport::http::Limits;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which transport to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    Stdio,
    /// `POST /mcp` and `GET /health` on a TCP port.
    Http,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("Invalid base directory {path}: {source}")]
    BaseDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A gateway exposing sandboxed file, date and health-check tools over MCP.
#[derive(Debug, Clone, Parser)]
#[command(name = "toolgate", version, about)]
pub struct Config {
    /// Transport to serve.
    #[arg(long, env = "TOOLGATE_TRANSPORT", value_enum, default_value_t = TransportKind::Stdio)]
    pub transport: TransportKind,

    /// Address the HTTP transport binds to.
    #[arg(long, env = "TOOLGATE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the HTTP transport binds to.
    #[arg(long, env = "TOOLGATE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Shared secret required on `POST /mcp`. Unset means open mode.
    #[arg(long, env = "TOOLGATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Root of the file tools' sandbox. Defaults to the current directory.
    #[arg(long, env = "TOOLGATE_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Largest accepted HTTP request body, in bytes.
    #[arg(long, env = "TOOLGATE_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Seconds a client may take to send its request. 0 disables the timeout.
    #[arg(long, env = "TOOLGATE_READ_TIMEOUT_SECS", default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// Include diagnostic detail in tool error results.
    #[arg(long, env = "TOOLGATE_DEBUG")]
    pub debug: bool,
}

impl Config {
    pub fn limits(&self) -> Limits {
        Limits {
            max_body_bytes: self.max_body_bytes,
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
        }
    }

    pub fn guard(&self) -> Guard {
        Guard::new(self.api_key.clone())
    }

    /// The sandbox root, canonicalized.
    pub fn base_dir(&self) -> Result<PathBuf, Error> {
        let path = match &self.base_dir {
            Some(path) => path.clone(),
            None => std::env::current_dir().map_err(Error::CurrentDir)?,
        };
        let canonical = path
            .canonicalize()
            .map_err(|source| Error::BaseDir { path: path.clone(), source })?;
        if !canonical.is_dir() {
            return Err(Error::BaseDir {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        Ok(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["toolgate"]).unwrap();
        assert_eq!(config.transport, TransportKind::Stdio);
        assert_eq!(config.port, 3000);
        assert_eq!(config.limits(), Limits::default());
        assert!(!config.debug);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "toolgate",
            "--transport",
            "http",
            "--port",
            "8080",
            "--api-key",
            "k",
            "--read-timeout-secs",
            "0",
            "--debug",
        ])
        .unwrap();
        assert_eq!(config.transport, TransportKind::Http);
        assert_eq!(config.port, 8080);
        assert!(!config.guard().is_open());
        assert_eq!(config.limits().read_timeout, None);
        assert!(config.debug);
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!(Config::try_parse_from(["toolgate", "--transport", "carrier-pigeon"]).is_err());
    }

    #[test]
    fn missing_base_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let config = Config::try_parse_from(["toolgate", "--base-dir", missing.to_str().unwrap()]).unwrap();
        assert!(matches!(config.base_dir(), Err(Error::BaseDir { .. })));
    }
}
