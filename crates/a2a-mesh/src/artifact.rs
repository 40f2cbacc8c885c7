//! Artifact — a durable output produced by a task.
//!
//! Streaming agents emit artifacts incrementally: the `index` field is the
//! stable ordinal of the artifact within the task, `append` extends the parts
//! at that ordinal instead of replacing them, and `last_chunk` marks the end
//! of an incremental artifact.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::message::Part;

/// An artifact produced by a task.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Human-readable name/title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description of what this artifact contains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The content parts of this artifact.
    pub parts: Vec<Part>,

    /// Stable ordinal of this artifact within the task.
    #[serde(default)]
    pub index: u32,

    /// Streaming: when true, `parts` extend the artifact at `index`
    /// instead of replacing it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,

    /// Streaming: marks the final chunk of an incremental artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,

    /// Optional metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Artifact {
    /// Create an artifact with a single text part.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            parts: vec![Part::text(content)],
            index: 0,
            append: None,
            last_chunk: None,
            metadata: None,
        }
    }

    /// Create an artifact with structured data.
    pub fn data(value: serde_json::Value) -> Self {
        Self {
            name: None,
            description: None,
            parts: vec![Part::data(value)],
            index: 0,
            append: None,
            last_chunk: None,
            metadata: None,
        }
    }

    /// Set the artifact name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the streaming ordinal.
    pub fn at_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Mark this artifact as an appending chunk.
    pub fn appending(mut self) -> Self {
        self.append = Some(true);
        self
    }

    /// Extract text content from this artifact.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
