//! JSON-RPC 2.0 transport binding for A2A.
//!
//! The primary wire protocol: all operations are encoded as JSON-RPC 2.0
//! requests/responses over HTTP(S). Streaming methods answer with an SSE
//! stream instead of a single response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

// ── A2A Methods ──────────────────────────────────────────────

/// Standard A2A JSON-RPC method names.
pub mod methods {
    /// Send a message to the agent (creates or continues a task).
    pub const SEND: &str = "tasks/send";

    /// Send a message and stream status/artifact updates over SSE.
    pub const SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";

    /// Get a task snapshot by id.
    pub const GET: &str = "tasks/get";

    /// Cancel a task.
    pub const CANCEL: &str = "tasks/cancel";

    /// Re-attach an SSE stream to a running task.
    pub const RESUBSCRIBE: &str = "tasks/resubscribe";

    /// Store a push notification config for a task.
    pub const PUSH_SET: &str = "tasks/pushNotification/set";

    /// Retrieve the push notification config for a task.
    pub const PUSH_GET: &str = "tasks/pushNotification/get";
}

/// MCP side-channel method names, served by the same router.
pub mod mcp_methods {
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_GET: &str = "resources/get";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const SAMPLING_CREATE: &str = "sampling/createMessage";
}

/// Whether a method answers with an SSE stream rather than a JSON envelope.
pub fn is_streaming_method(method: &str) -> bool {
    matches!(method, methods::SEND_SUBSCRIBE | methods::RESUBSCRIBE)
}

// ── JSON-RPC Request ─────────────────────────────────────────

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The method to invoke.
    pub method: String,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Request identifier. Absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request with a generated numeric id.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
            id: Some(RequestId::Number(rand_id())),
        }
    }

    /// Create a `tasks/send` request.
    pub fn send(params: Value) -> Self {
        Self::new(methods::SEND, Some(params))
    }

    /// Create a `tasks/sendSubscribe` request.
    pub fn send_subscribe(params: Value) -> Self {
        Self::new(methods::SEND_SUBSCRIBE, Some(params))
    }

    /// Create a `tasks/get` request.
    pub fn get(params: Value) -> Self {
        Self::new(methods::GET, Some(params))
    }

    /// Create a `tasks/cancel` request.
    pub fn cancel(task_id: &str) -> Self {
        Self::new(methods::CANCEL, Some(serde_json::json!({ "id": task_id })))
    }

    /// Create a `tasks/resubscribe` request.
    pub fn resubscribe(task_id: &str) -> Self {
        Self::new(
            methods::RESUBSCRIBE,
            Some(serde_json::json!({ "id": task_id })),
        )
    }

    /// True when this request is a notification (carries no id).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

// ── JSON-RPC Response ────────────────────────────────────────

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The result (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// The error (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// The request identifier this response corresponds to.
    pub id: RequestId,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response.
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extract the result, returning the error if this is an error response.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

// ── JSON-RPC Error ───────────────────────────────────────────

/// Application-band error codes for task-layer failures.
pub mod codes {
    pub const TASK_NOT_FOUND: i64 = -32001;
    pub const TASK_TERMINAL: i64 = -32002;
    pub const TASK_ALREADY_EXISTS: i64 = -32003;
    pub const ILLEGAL_TRANSITION: i64 = -32004;
    pub const UNSUPPORTED_OPERATION: i64 = -32005;
}

/// A JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Standard JSON-RPC error: Parse error (-32700).
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: "Parse error".into(),
            data: Some(Value::String(detail.into())),
        }
    }

    /// Standard JSON-RPC error: Invalid request (-32600).
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: "Invalid Request".into(),
            data: Some(Value::String(detail.into())),
        }
    }

    /// Standard JSON-RPC error: Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "Method not found".into(),
            data: Some(Value::String(format!("Unknown method: {method}"))),
        }
    }

    /// Standard JSON-RPC error: Invalid params (-32602).
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: "Invalid params".into(),
            data: Some(Value::String(detail.into())),
        }
    }

    /// Standard JSON-RPC error: Internal error (-32603).
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: "Internal error".into(),
            data: Some(Value::String(detail.into())),
        }
    }

    /// A2A: the referenced task does not exist.
    pub fn task_not_found(task_id: &str) -> Self {
        Self {
            code: codes::TASK_NOT_FOUND,
            message: "task not found".into(),
            data: Some(Value::String(format!("Task {task_id} not found"))),
        }
    }

    /// A2A: the task is in a terminal state and cannot be mutated.
    pub fn task_terminal(task_id: &str) -> Self {
        Self {
            code: codes::TASK_TERMINAL,
            message: "task is in a terminal state".into(),
            data: Some(Value::String(format!(
                "Task {task_id} has reached a terminal state"
            ))),
        }
    }

    /// A2A: a task with this id already exists.
    pub fn task_already_exists(task_id: &str) -> Self {
        Self {
            code: codes::TASK_ALREADY_EXISTS,
            message: "task already exists".into(),
            data: Some(Value::String(format!("Task {task_id} already exists"))),
        }
    }

    /// A2A: the requested state transition is not an edge of the lifecycle graph.
    pub fn illegal_transition(detail: impl Into<String>) -> Self {
        Self {
            code: codes::ILLEGAL_TRANSITION,
            message: "illegal state transition".into(),
            data: Some(Value::String(detail.into())),
        }
    }

    /// A2A: the operation is not supported by this agent.
    pub fn unsupported_operation(detail: impl Into<String>) -> Self {
        Self {
            code: codes::UNSUPPORTED_OPERATION,
            message: "unsupported operation".into(),
            data: Some(Value::String(detail.into())),
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

// ── Request ID ───────────────────────────────────────────────

/// JSON-RPC request identifier (a number, a string, or null).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

/// Generate a random request id.
fn rand_id() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| (d.as_nanos() % i64::MAX as u128) as i64)
        .unwrap_or(1)
}
