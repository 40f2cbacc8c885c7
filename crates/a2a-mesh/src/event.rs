//! Streaming task events delivered over SSE.
//!
//! Each SSE frame carries one of these bodies on its `data:` line. Within a
//! task, events are observed in publication order; a `final: true` status
//! update terminates the stream.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::task::TaskStatus;

/// A task status transition, as delivered to stream subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    /// The task this event belongs to.
    pub id: String,

    /// The new status.
    pub status: TaskStatus,

    /// True when this is the last event of the stream.
    #[serde(rename = "final", default)]
    pub is_final: bool,
}

/// An artifact update, as delivered to stream subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    /// The task this event belongs to.
    pub id: String,

    /// The artifact chunk (see [`Artifact::append`] for merge semantics).
    pub artifact: Artifact,

    /// True when this is the last event of the stream.
    #[serde(rename = "final", default)]
    pub is_final: bool,
}

/// Either kind of per-task stream event.
///
/// The two shapes are disjoint on their `status`/`artifact` field, so the
/// wire representation needs no extra discriminator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TaskUpdate {
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

impl TaskUpdate {
    /// Build a status update event.
    pub fn status(id: impl Into<String>, status: TaskStatus, is_final: bool) -> Self {
        TaskUpdate::Status(TaskStatusUpdateEvent {
            id: id.into(),
            status,
            is_final,
        })
    }

    /// Build an artifact update event.
    pub fn artifact(id: impl Into<String>, artifact: Artifact) -> Self {
        TaskUpdate::Artifact(TaskArtifactUpdateEvent {
            id: id.into(),
            artifact,
            is_final: false,
        })
    }

    /// The id of the task this update belongs to.
    pub fn task_id(&self) -> &str {
        match self {
            TaskUpdate::Status(e) => &e.id,
            TaskUpdate::Artifact(e) => &e.id,
        }
    }

    /// Whether this update terminates the stream.
    pub fn is_final(&self) -> bool {
        match self {
            TaskUpdate::Status(e) => e.is_final,
            TaskUpdate::Artifact(e) => e.is_final,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    #[test]
    fn test_status_event_frame_shape() {
        let event = TaskUpdate::status("t1", TaskStatus::new(TaskState::Working), false);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""id":"t1""#));
        assert!(json.contains(r#""state":"working""#));
        assert!(json.contains(r#""final":false"#));
    }

    #[test]
    fn test_untagged_round_trip() {
        let status = TaskUpdate::status("t1", TaskStatus::new(TaskState::Completed), true);
        let artifact = TaskUpdate::artifact("t1", crate::artifact::Artifact::text("out"));

        for event in [status, artifact] {
            let json = serde_json::to_string(&event).unwrap();
            let parsed: TaskUpdate = serde_json::from_str(&json).unwrap();
            match (&event, &parsed) {
                (TaskUpdate::Status(a), TaskUpdate::Status(b)) => {
                    assert_eq!(a.status.state, b.status.state)
                }
                (TaskUpdate::Artifact(a), TaskUpdate::Artifact(b)) => {
                    assert_eq!(a.artifact.text_content(), b.artifact.text_content())
                }
                _ => panic!("event kind changed across round trip"),
            }
        }
    }
}
