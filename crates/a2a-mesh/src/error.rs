//! A2A protocol error types.

use thiserror::Error;

use crate::transport::jsonrpc::JsonRpcError;

/// Errors that can occur when speaking the A2A protocol.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Failed to discover the agent card at the well-known endpoint.
    #[error("agent discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The agent card is invalid or missing required fields.
    #[error("invalid agent card: {0}")]
    InvalidAgentCard(String),

    /// A message part failed structural validation.
    #[error("invalid part: {0}")]
    InvalidPart(String),

    /// HTTP transport error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote agent returned a JSON-RPC error.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Streaming error (SSE).
    #[error("streaming error: {0}")]
    Streaming(String),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<JsonRpcError> for MeshError {
    fn from(e: JsonRpcError) -> Self {
        MeshError::JsonRpc {
            code: e.code,
            message: e.message,
            data: e.data,
        }
    }
}

/// A2A Result type alias.
pub type MeshResult<T> = Result<T, MeshError>;
