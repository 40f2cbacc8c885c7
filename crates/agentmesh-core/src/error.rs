//! Core error taxonomy.
//!
//! Component failures carry a kind tag so upper layers can decide whether to
//! retry, surface, or degrade. Errors surfaced at the RPC boundary map onto
//! the JSON-RPC application band; raw messages from external systems are
//! never echoed to callers verbatim.

use a2a_mesh::transport::jsonrpc::JsonRpcError;
use a2a_mesh::TaskState;
use thiserror::Error;

/// Errors produced by the task engine and its satellites.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(String),

    /// A task with this id already exists.
    #[error("task already exists: {0}")]
    AlreadyExists(String),

    /// The task is in a terminal state and cannot be mutated.
    #[error("task {0} is in a terminal state")]
    Terminal(String),

    /// The requested transition is not an edge of the lifecycle graph.
    #[error("illegal transition for task {id}: {from} → {to}")]
    IllegalTransition {
        id: String,
        from: TaskState,
        to: TaskState,
    },

    /// Malformed or out-of-range request parameters.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The operation is not supported by this agent.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A delegation call to a peer agent failed.
    #[error("delegation failed: {0}")]
    Delegation(#[from] a2a_mesh::MeshError),

    /// Push signing or delivery failure.
    #[error("push notification failure: {0}")]
    Push(String),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal failure not attributable to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for JsonRpcError {
    fn from(e: CoreError) -> Self {
        match &e {
            CoreError::NotFound(id) => JsonRpcError::task_not_found(id),
            CoreError::AlreadyExists(id) => JsonRpcError::task_already_exists(id),
            CoreError::Terminal(id) => JsonRpcError::task_terminal(id),
            CoreError::IllegalTransition { .. } => JsonRpcError::illegal_transition(e.to_string()),
            CoreError::InvalidParams(detail) => JsonRpcError::invalid_params(detail.clone()),
            CoreError::Unsupported(detail) => JsonRpcError::unsupported_operation(detail.clone()),
            CoreError::Delegation(inner) => match inner {
                a2a_mesh::MeshError::JsonRpc { code, message, data } => JsonRpcError {
                    code: *code,
                    message: message.clone(),
                    data: data.clone(),
                },
                _ => JsonRpcError::internal_error("delegation to peer agent failed"),
            },
            // Internal details stay in the logs.
            CoreError::Push(_) | CoreError::Serialization(_) | CoreError::Internal(_) => {
                JsonRpcError::internal_error("internal error")
            }
        }
    }
}

/// Core result type alias.
pub type CoreResult<T> = Result<T, CoreError>;
