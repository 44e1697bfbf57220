use std::path::PathBuf;
use std::time::Duration;

use hyper::StatusCode;

/// Errors talking to the container runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported runtime address `{0}`, expected `unix://<path>`")]
    UnsupportedAddress(String),
    #[error("failed to connect to socket `{path}`: {source}")]
    SocketConnect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP handshake with runtime failed: {0}")]
    Handshake(#[source] hyper::Error),
    #[error("invalid runtime request URL: {0}")]
    InvalidUrl(#[source] url::ParseError),
    #[error("failed to build runtime request: {0}")]
    BuildRequest(#[source] hyper::http::Error),
    #[error("runtime request failed: {0}")]
    Request(#[source] hyper::Error),
    #[error("runtime did not respond within {0:?}")]
    Timeout(Duration),
    #[error("runtime responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to read runtime response body: {0}")]
    Body(#[source] hyper::Error),
    #[error("failed to decode runtime response: {0}")]
    Decode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
