//! Memory records and typed relations.
//!
//! A memory lives outside any task's lifetime: it is written to the vector
//! store for similarity search and mirrored into the graph store under the
//! same id so relations can attach to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A single durable memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Unique identifier, shared between the vector and graph stores.
    pub id: String,

    /// The memory's content.
    pub content: String,

    /// Embedding of the content, when computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Arbitrary metadata used for filtered search.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Type tag (e.g. "knowledge", "message").
    #[serde(rename = "type")]
    pub memory_type: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Memory {
    /// Create a memory with a generated id, stamped now.
    pub fn new(
        content: impl Into<String>,
        metadata: Map<String, Value>,
        memory_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            embedding: None,
            metadata,
            memory_type: memory_type.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A typed, directed relation between two memory records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub source_id: String,

    pub target_id: String,

    /// Relation type (e.g. "related_to", "derived_from").
    #[serde(rename = "type")]
    pub relation_type: String,

    /// Arbitrary edge properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    pub created_at: DateTime<Utc>,
}

impl Relation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            properties,
            created_at: Utc::now(),
        }
    }
}
