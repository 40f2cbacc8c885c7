//! Task — the stateful unit of work in the A2A protocol.
//!
//! Tasks have a full lifecycle with well-defined state transitions:
//!
//! ```text
//! submitted → working → completed (terminal)
//!                     → failed (terminal)
//!                     → canceled (terminal)
//!                     → input-required → working
//! ```
//!
//! Terminal states are sticky: once a task completes, fails, or is canceled,
//! no further transition or mutation is accepted.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::message::Message;
use crate::notification::PushNotificationConfig;

/// A Task — the fundamental unit of work in A2A.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for this task (caller-supplied or generated).
    pub id: String,

    /// Session identifier grouping related tasks.
    pub session_id: String,

    /// Current status of the task.
    pub status: TaskStatus,

    /// Messages exchanged during the task, in append order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,

    /// Artifacts produced by the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Opaque metadata attached to the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// Webhook configuration applied on terminal transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notification: Option<PushNotificationConfig>,

    /// Parent task id, set on delegated sub-tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Task {
    /// Create a new task in `submitted` state.
    pub fn new(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            status: TaskStatus::new(TaskState::Submitted),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: None,
            push_notification: None,
            parent_id: None,
        }
    }

    /// Create a new task with a generated id and session.
    pub fn generate() -> Self {
        Self::new(
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
        )
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// The most recent message in the task history, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// The most recent user message in the task history, if any.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == crate::message::Role::User)
    }
}

/// Status of a task: state, optional agent message, and a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Current lifecycle state.
    pub state: TaskState,

    /// Optional message attached to the transition (e.g. a form request
    /// for `input-required`, or a failure description).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,

    /// When the status was recorded.
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    /// Create a status stamped now.
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a status with an attached message, stamped now.
    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// The state of a task in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been submitted but not yet started.
    Submitted,

    /// Task is actively being worked on.
    Working,

    /// Task is suspended, waiting for additional input from the caller.
    InputRequired,

    /// Task completed successfully (terminal).
    Completed,

    /// Task failed (terminal).
    Failed,

    /// Task was canceled by the caller (terminal).
    Canceled,
}

impl TaskState {
    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Check whether a transition to `next` is an edge of the lifecycle graph.
    pub fn can_transition(&self, next: TaskState) -> bool {
        use TaskState::*;
        match self {
            Submitted => matches!(next, Working | InputRequired | Canceled | Failed),
            Working => matches!(next, Completed | Failed | Canceled | InputRequired),
            InputRequired => matches!(next, Working | Canceled | Failed),
            Completed | Failed | Canceled => false,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Working => write!(f, "working"),
            TaskState::InputRequired => write!(f, "input-required"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Canceled => write!(f, "canceled"),
        }
    }
}
