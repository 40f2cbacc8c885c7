//! Vector store — semantic similarity over memory embeddings.
//!
//! The trait is the driver seam; the in-memory reference store ranks by
//! cosine similarity and applies the same filter semantics a backed store
//! (Qdrant, pgvector, …) would.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::embed::cosine_similarity;
use crate::error::{MemoryError, MemoryResult};
use crate::types::Memory;

/// Comparison operator for metadata filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

/// A single metadata predicate. All filters on a search must hold (AND).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Metadata field, or the built-ins "content" / "type".
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    /// Evaluate this predicate against a memory record.
    pub fn matches(&self, memory: &Memory) -> bool {
        let actual = match self.field.as_str() {
            "content" => Some(Value::String(memory.content.clone())),
            "type" => Some(Value::String(memory.memory_type.clone())),
            field => memory.metadata.get(field).cloned(),
        };
        let Some(actual) = actual else {
            return false;
        };

        match self.op {
            FilterOp::Eq => actual == self.value,
            FilterOp::Ne => actual != self.value,
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let (Some(a), Some(b)) = (actual.as_f64(), self.value.as_f64()) else {
                    return false;
                };
                match self.op {
                    FilterOp::Gt => a > b,
                    FilterOp::Gte => a >= b,
                    FilterOp::Lt => a < b,
                    FilterOp::Lte => a <= b,
                    _ => unreachable!(),
                }
            }
            FilterOp::Contains => match (&actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
        }
    }
}

/// Search parameters for similarity queries.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Maximum results; 0 means no limit for the reference store (backed
    /// stores may impose a hard cap).
    pub limit: usize,

    /// Type allow-list; empty means any type.
    pub types: Vec<String>,

    /// Metadata predicates, AND-combined.
    pub filters: Vec<FieldFilter>,
}

impl SearchParams {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }
}

/// Driver seam for semantic similarity storage.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store_memory(&self, memory: Memory) -> MemoryResult<String>;

    /// Bulk upsert. The default implementation loops; backed stores override
    /// with a single round trip.
    async fn store_batch(&self, memories: Vec<Memory>) -> MemoryResult<Vec<String>> {
        let mut ids = Vec::with_capacity(memories.len());
        for memory in memories {
            ids.push(self.store_memory(memory).await?);
        }
        Ok(ids)
    }

    async fn get_memory(&self, id: &str) -> MemoryResult<Option<Memory>>;

    async fn search_similar(
        &self,
        vector: &[f32],
        params: &SearchParams,
    ) -> MemoryResult<Vec<Memory>>;

    async fn delete_memory(&self, id: &str) -> MemoryResult<()>;

    async fn ping(&self) -> bool;
}

/// Reference in-memory vector store.
#[derive(Default)]
pub struct InMemoryVectorStore {
    memories: RwLock<HashMap<String, Memory>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn store_memory(&self, memory: Memory) -> MemoryResult<String> {
        if memory.embedding.is_none() {
            return Err(MemoryError::Store(format!(
                "memory {} has no embedding",
                memory.id
            )));
        }
        let id = memory.id.clone();
        self.memories.write().await.insert(id.clone(), memory);
        Ok(id)
    }

    async fn get_memory(&self, id: &str) -> MemoryResult<Option<Memory>> {
        Ok(self.memories.read().await.get(id).cloned())
    }

    async fn search_similar(
        &self,
        vector: &[f32],
        params: &SearchParams,
    ) -> MemoryResult<Vec<Memory>> {
        let memories = self.memories.read().await;
        let mut scored: Vec<(f32, &Memory)> = memories
            .values()
            .filter(|m| params.types.is_empty() || params.types.contains(&m.memory_type))
            .filter(|m| params.filters.iter().all(|f| f.matches(m)))
            .filter_map(|m| {
                m.embedding
                    .as_deref()
                    .map(|e| (cosine_similarity(vector, e), m))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        if params.limit > 0 {
            scored.truncate(params.limit);
        }
        Ok(scored.into_iter().map(|(_, m)| m.clone()).collect())
    }

    async fn delete_memory(&self, id: &str) -> MemoryResult<()> {
        self.memories.write().await.remove(id);
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{Embedder, HashEmbedder};
    use serde_json::{json, Map};

    async fn memory(content: &str, memory_type: &str, metadata: Map<String, Value>) -> Memory {
        let embedder = HashEmbedder::default();
        let mut memory = Memory::new(content, metadata, memory_type);
        memory.embedding = Some(embedder.embed(content).await.unwrap());
        memory
    }

    fn meta(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_similarity_ranking() {
        let store = InMemoryVectorStore::new();
        let hello = memory("hello world", "knowledge", Map::new()).await;
        let hello_id = hello.id.clone();
        store.store_memory(hello).await.unwrap();
        store
            .store_memory(memory("quarterly finance report", "knowledge", Map::new()).await)
            .await
            .unwrap();

        let query = HashEmbedder::default().embed("hello").await.unwrap();
        let results = store
            .search_similar(&query, &SearchParams::with_limit(5))
            .await
            .unwrap();
        assert_eq!(results[0].id, hello_id);
    }

    #[tokio::test]
    async fn test_type_allow_list() {
        let store = InMemoryVectorStore::new();
        store
            .store_memory(memory("alpha", "knowledge", Map::new()).await)
            .await
            .unwrap();
        store
            .store_memory(memory("alpha", "message", Map::new()).await)
            .await
            .unwrap();

        let query = HashEmbedder::default().embed("alpha").await.unwrap();
        let params = SearchParams {
            types: vec!["message".into()],
            ..SearchParams::with_limit(10)
        };
        let results = store.search_similar(&query, &params).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].memory_type, "message");
    }

    #[tokio::test]
    async fn test_filters_are_anded() {
        let store = InMemoryVectorStore::new();
        store
            .store_memory(
                memory(
                    "alpha",
                    "knowledge",
                    meta(&[("score", json!(7)), ("topic", json!("rust"))]),
                )
                .await,
            )
            .await
            .unwrap();
        store
            .store_memory(
                memory(
                    "alpha",
                    "knowledge",
                    meta(&[("score", json!(2)), ("topic", json!("rust"))]),
                )
                .await,
            )
            .await
            .unwrap();

        let query = HashEmbedder::default().embed("alpha").await.unwrap();
        let params = SearchParams {
            filters: vec![
                FieldFilter {
                    field: "topic".into(),
                    op: FilterOp::Eq,
                    value: json!("rust"),
                },
                FieldFilter {
                    field: "score".into(),
                    op: FilterOp::Gte,
                    value: json!(5),
                },
            ],
            ..SearchParams::with_limit(10)
        };
        let results = store.search_similar(&query, &params).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["score"], json!(7));
    }

    #[tokio::test]
    async fn test_zero_limit_returns_everything() {
        let store = InMemoryVectorStore::new();
        for i in 0..12 {
            store
                .store_memory(memory(&format!("item {i}"), "knowledge", Map::new()).await)
                .await
                .unwrap();
        }
        let query = HashEmbedder::default().embed("item").await.unwrap();
        let results = store
            .search_similar(&query, &SearchParams::with_limit(0))
            .await
            .unwrap();
        assert_eq!(results.len(), 12);
    }

    #[tokio::test]
    async fn test_contains_filter() {
        let filter = FieldFilter {
            field: "content".into(),
            op: FilterOp::Contains,
            value: json!("wor"),
        };
        let m = memory("hello world", "knowledge", Map::new()).await;
        assert!(filter.matches(&m));

        let tags = FieldFilter {
            field: "tags".into(),
            op: FilterOp::Contains,
            value: json!("alpha"),
        };
        let m = memory("x", "knowledge", meta(&[("tags", json!(["alpha", "beta"]))])).await;
        assert!(tags.matches(&m));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryVectorStore::new();
        let m = memory("ephemeral", "knowledge", Map::new()).await;
        let id = store.store_memory(m).await.unwrap();
        assert!(store.get_memory(&id).await.unwrap().is_some());
        store.delete_memory(&id).await.unwrap();
        assert!(store.get_memory(&id).await.unwrap().is_none());
    }
}
