//! Parameter shapes for the A2A JSON-RPC methods.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::notification::PushNotificationConfig;

/// Parameters for `tasks/send` and `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    /// Task id — caller-supplied; creates the task on first use.
    pub id: String,

    /// Session grouping id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// The message to deliver to the agent.
    pub message: Message,

    /// Optional webhook config, stored and applied on terminal transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification: Option<PushNotificationConfig>,

    /// Truncate the returned history to the most recent N messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,

    /// Opaque metadata merged into the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// Parent task id, recorded on delegated sub-tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl TaskSendParams {
    pub fn new(id: impl Into<String>, message: Message) -> Self {
        Self {
            id: id.into(),
            session_id: None,
            message,
            push_notification: None,
            history_length: None,
            metadata: None,
            parent_id: None,
        }
    }
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// Task id.
    pub id: String,

    /// Truncate the returned history to the most recent N messages.
    /// Zero returns an empty history; negative values are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,
}

/// Parameters for methods addressing a task by id only
/// (`tasks/cancel`, `tasks/resubscribe`, `tasks/pushNotification/get`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskIdParams {
    /// Task id.
    pub id: String,
}

/// Parameters for `tasks/pushNotification/set`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskPushConfigParams {
    /// Task id.
    pub id: String,

    /// The webhook configuration to store.
    pub push_notification_config: PushNotificationConfig,
}
