//! Graph store — typed directed relations between memory records.
//!
//! Cycles are allowed; traversal is bounded by a limit and a visited set so
//! `find_related` terminates regardless of graph shape.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{MemoryError, MemoryResult};
use crate::types::{Memory, Relation};

/// Driver seam for relation storage.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Mirror a memory node so relations can attach to it.
    async fn store_memory(&self, memory: Memory) -> MemoryResult<String>;

    async fn create_relation(&self, relation: Relation) -> MemoryResult<()>;

    /// Memories reachable from `id` over the given relation types (empty
    /// means any), breadth-first, bounded by `limit`.
    async fn find_related(
        &self,
        id: &str,
        relation_types: &[String],
        limit: usize,
    ) -> MemoryResult<Vec<Memory>>;

    /// Free-form query against the backing graph. The reference store
    /// treats the query as a substring match over node content; backed
    /// stores interpret it natively (e.g. Cypher).
    async fn query_graph(&self, query: &str, params: &Value) -> MemoryResult<Vec<Memory>>;

    async fn delete_memory(&self, id: &str) -> MemoryResult<()>;

    async fn delete_relation(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
    ) -> MemoryResult<()>;

    async fn ping(&self) -> bool;
}

/// Reference in-memory graph store: adjacency over a node map.
#[derive(Default)]
pub struct InMemoryGraphStore {
    nodes: RwLock<HashMap<String, Memory>>,
    edges: RwLock<Vec<Relation>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn store_memory(&self, memory: Memory) -> MemoryResult<String> {
        let id = memory.id.clone();
        self.nodes.write().await.insert(id.clone(), memory);
        Ok(id)
    }

    async fn create_relation(&self, relation: Relation) -> MemoryResult<()> {
        let nodes = self.nodes.read().await;
        for endpoint in [&relation.source_id, &relation.target_id] {
            if !nodes.contains_key(endpoint) {
                return Err(MemoryError::NotFound(endpoint.clone()));
            }
        }
        drop(nodes);
        self.edges.write().await.push(relation);
        Ok(())
    }

    async fn find_related(
        &self,
        id: &str,
        relation_types: &[String],
        limit: usize,
    ) -> MemoryResult<Vec<Memory>> {
        let nodes = self.nodes.read().await;
        if !nodes.contains_key(id) {
            return Err(MemoryError::NotFound(id.to_string()));
        }
        let edges = self.edges.read().await;

        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut queue: VecDeque<&str> = VecDeque::from([id]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            if limit > 0 && out.len() >= limit {
                break;
            }
            for edge in edges.iter().filter(|e| {
                e.source_id == current
                    && (relation_types.is_empty() || relation_types.contains(&e.relation_type))
            }) {
                if limit > 0 && out.len() >= limit {
                    break;
                }
                if visited.insert(edge.target_id.as_str()) {
                    if let Some(memory) = nodes.get(&edge.target_id) {
                        out.push(memory.clone());
                    }
                    queue.push_back(edge.target_id.as_str());
                }
            }
        }
        Ok(out)
    }

    async fn query_graph(&self, query: &str, _params: &Value) -> MemoryResult<Vec<Memory>> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .values()
            .filter(|m| m.content.contains(query))
            .cloned()
            .collect())
    }

    async fn delete_memory(&self, id: &str) -> MemoryResult<()> {
        self.nodes.write().await.remove(id);
        self.edges
            .write()
            .await
            .retain(|e| e.source_id != id && e.target_id != id);
        Ok(())
    }

    async fn delete_relation(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
    ) -> MemoryResult<()> {
        self.edges.write().await.retain(|e| {
            !(e.source_id == source_id
                && e.target_id == target_id
                && e.relation_type == relation_type)
        });
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}
