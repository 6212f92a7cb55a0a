use thiserror::Error;

use crate::protocol::TransportError;

/// Errors surfaced by a [`LockClient`](super::LockClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to '{endpoint}': {source}")]
    Connect {
        endpoint: String,
        source: TransportError,
    },

    #[error("malformed message from server '{line}': {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    #[error("handler for {target} panicked: {reason}")]
    Handler { target: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
