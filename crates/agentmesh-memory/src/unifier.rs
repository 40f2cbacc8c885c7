//! Unified memory — one façade over the vector and graph stores.
//!
//! Writes are embedded, buffered, and flushed in batches to the vector store
//! with the graph node mirrored in the same flush cycle. Similarity results
//! land in a bounded TTL cache. Two task-driven operations sit on top:
//! `inject_memories` appends retrieved context to a task's history, and
//! `extract_memories` stores a task's latest message as durable memory.
//! When a backing store is unavailable, both degrade to logged no-ops.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lru_time_cache::LruCache;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use a2a_mesh::{Message, Part, Task};

use crate::embed::Embedder;
use crate::error::{MemoryError, MemoryResult};
use crate::graph::GraphStore;
use crate::types::{Memory, Relation};
use crate::vector::{SearchParams, VectorStore};

/// Tuning for the unifier.
#[derive(Debug, Clone)]
pub struct UnifierConfig {
    /// Buffered writes per bulk flush.
    pub batch_size: usize,

    /// Flush timer period.
    pub flush_interval: Duration,

    /// Similarity-result cache capacity.
    pub cache_capacity: usize,

    /// Similarity-result cache TTL.
    pub cache_ttl: Duration,

    /// Memories retrieved per injection.
    pub inject_limit: usize,

    /// Related memories pulled per injected hit.
    pub related_limit: usize,

    /// Whether injection also follows graph relations.
    pub inject_relations: bool,
}

impl Default for UnifierConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            flush_interval: Duration::from_secs(5),
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(600),
            inject_limit: 5,
            related_limit: 3,
            inject_relations: true,
        }
    }
}

/// The memory façade combining embedder, vector store, and graph store.
pub struct UnifiedMemory {
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    cache: Mutex<LruCache<String, Memory>>,
    buffer: Mutex<Vec<Memory>>,
    config: UnifierConfig,
}

impl UnifiedMemory {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        config: UnifierConfig,
    ) -> Self {
        let cache = LruCache::with_expiry_duration_and_capacity(
            config.cache_ttl,
            config.cache_capacity,
        );
        Self {
            embedder,
            vector,
            graph,
            cache: Mutex::new(cache),
            buffer: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Construct and start the background flush timer.
    pub fn spawn(
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorStore>,
        graph: Arc<dyn GraphStore>,
        config: UnifierConfig,
    ) -> Arc<Self> {
        let interval = config.flush_interval;
        let unifier = Arc::new(Self::new(embedder, vector, graph, config));
        let weak: Weak<Self> = Arc::downgrade(&unifier);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(unifier) => unifier.flush().await,
                    None => break,
                }
            }
        });
        unifier
    }

    /// True when both backing stores answer their ping.
    pub async fn healthy(&self) -> bool {
        self.vector.ping().await && self.graph.ping().await
    }

    // ── Writes ───────────────────────────────────────────────

    /// Embed and buffer a new memory; flushes when the buffer fills.
    /// Returns the memory id immediately.
    pub async fn store_memory(
        &self,
        content: impl Into<String>,
        metadata: Map<String, Value>,
        memory_type: impl Into<String>,
    ) -> MemoryResult<String> {
        let content = content.into();
        let embedding = self
            .embedder
            .embed(&content)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let mut memory = Memory::new(content, metadata, memory_type);
        memory.embedding = Some(embedding);
        let id = memory.id.clone();

        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(memory);
            buffer.len() >= self.config.batch_size
        };
        if full {
            self.flush().await;
        }
        Ok(id)
    }

    /// Flush buffered writes: one bulk vector upsert (falling back to
    /// per-item writes on bulk failure) and the graph mirror.
    pub async fn flush(&self) {
        let batch: Vec<Memory> = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };
        if batch.is_empty() {
            return;
        }
        tracing::debug!(count = batch.len(), "Flushing memory batch");

        if let Err(e) = self.vector.store_batch(batch.clone()).await {
            tracing::warn!(error = %e, "Bulk memory write failed; falling back to per-item writes");
            for memory in &batch {
                if let Err(e) = self.vector.store_memory(memory.clone()).await {
                    tracing::warn!(memory_id = %memory.id, error = %e, "Memory write dropped");
                }
            }
        }

        for memory in batch {
            let mut node = memory;
            node.embedding = None;
            if let Err(e) = self.graph.store_memory(node).await {
                tracing::warn!(error = %e, "Graph mirror write dropped");
            }
        }
    }

    /// Create a typed relation between two stored memories.
    pub async fn create_relation(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: &str,
        properties: Map<String, Value>,
    ) -> MemoryResult<()> {
        // Relations can only attach to mirrored nodes.
        self.flush().await;
        self.graph
            .create_relation(Relation::new(
                source_id,
                target_id,
                relation_type,
                properties,
            ))
            .await
    }

    /// Remove a memory from both stores and the cache.
    pub async fn delete_memory(&self, id: &str) -> MemoryResult<()> {
        self.cache.lock().await.remove(id);
        self.vector.delete_memory(id).await?;
        self.graph.delete_memory(id).await
    }

    // ── Reads ────────────────────────────────────────────────

    /// Fetch one memory, preferring the cache.
    pub async fn get_memory(&self, id: &str) -> MemoryResult<Option<Memory>> {
        if let Some(memory) = self.cache.lock().await.get(id) {
            return Ok(Some(memory.clone()));
        }
        let fetched = self.vector.get_memory(id).await?;
        if let Some(ref memory) = fetched {
            self.cache.lock().await.insert(id.to_string(), memory.clone());
        }
        Ok(fetched)
    }

    /// Semantic search over the vector store; results land in the cache.
    pub async fn search_similar(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> MemoryResult<Vec<Memory>> {
        self.flush().await;
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        let results = self.vector.search_similar(&vector, params).await?;

        let mut cache = self.cache.lock().await;
        for memory in &results {
            cache.insert(memory.id.clone(), memory.clone());
        }
        Ok(results)
    }

    /// Memories related to `id` over the given relation types.
    pub async fn find_related(
        &self,
        id: &str,
        relation_types: &[String],
        limit: usize,
    ) -> MemoryResult<Vec<Memory>> {
        self.flush().await;
        self.graph.find_related(id, relation_types, limit).await
    }

    // ── Task-driven operations ───────────────────────────────

    /// Retrieve context for the task's most recent user message and append
    /// it to the history as `system` messages (`name = "memory"`, related
    /// memories as `name = "relation"`). Returns the number injected.
    /// Store outages degrade to a logged no-op.
    pub async fn inject_memories(&self, task: &mut Task) -> usize {
        let Some(query) = task.last_user_message().map(|m| m.text_content()) else {
            return 0;
        };
        if query.trim().is_empty() {
            return 0;
        }

        let hits = match self
            .search_similar(&query, &SearchParams::with_limit(self.config.inject_limit))
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "Memory unavailable; skipping context injection");
                return 0;
            }
        };

        let mut seen: HashSet<String> = hits.iter().map(|m| m.id.clone()).collect();
        let mut injected = 0;

        for hit in &hits {
            task.history.push(Message::system(
                vec![Part::text(hit.content.clone())],
                Some("memory".into()),
            ));
            injected += 1;
        }

        if self.config.inject_relations {
            for hit in &hits {
                let related = match self
                    .graph
                    .find_related(&hit.id, &[], self.config.related_limit)
                    .await
                {
                    Ok(related) => related,
                    Err(e) => {
                        tracing::debug!(memory_id = %hit.id, error = %e, "No graph context for memory");
                        continue;
                    }
                };
                for memory in related {
                    if seen.insert(memory.id.clone()) {
                        task.history.push(Message::system(
                            vec![Part::text(memory.content)],
                            Some("relation".into()),
                        ));
                        injected += 1;
                    }
                }
            }
        }

        tracing::debug!(task_id = %task.id, injected, "Injected memories into task");
        injected
    }

    /// Store the task's most recent message as a durable memory of type
    /// "message". Returns the new memory id, or None when there is nothing
    /// to store or the store is unavailable.
    pub async fn extract_memories(&self, task: &Task) -> Option<String> {
        let message = task.last_message()?;
        let content = message.text_content();
        if content.trim().is_empty() {
            return None;
        }
        if !self.vector.ping().await {
            tracing::warn!(task_id = %task.id, "Memory unavailable; skipping extraction");
            return None;
        }

        let mut metadata = Map::new();
        metadata.insert("role".into(), Value::String(message.role.to_string()));

        match self.store_memory(content, metadata, "message").await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "Memory unavailable; skipping extraction");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use crate::graph::InMemoryGraphStore;
    use crate::vector::InMemoryVectorStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn unifier() -> UnifiedMemory {
        UnifiedMemory::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryGraphStore::new()),
            UnifierConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_store_then_search_round_trip() {
        let memory = unifier();
        let mut metadata = Map::new();
        metadata.insert("topic".into(), Value::String("test".into()));

        let id = memory
            .store_memory("hello world", metadata, "knowledge")
            .await
            .unwrap();

        let results = memory
            .search_similar("hello", &SearchParams::with_limit(5))
            .await
            .unwrap();
        assert!(results.iter().any(|m| m.id == id));
    }

    #[tokio::test]
    async fn test_relations_round_trip() {
        let memory = unifier();
        let a = memory
            .store_memory("alpha fact", Map::new(), "knowledge")
            .await
            .unwrap();
        let b = memory
            .store_memory("beta fact", Map::new(), "knowledge")
            .await
            .unwrap();

        memory
            .create_relation(&a, &b, "related_to", Map::new())
            .await
            .unwrap();

        let related = memory
            .find_related(&a, &["related_to".to_string()], 10)
            .await
            .unwrap();
        assert!(related.iter().any(|m| m.id == b));
    }

    #[tokio::test]
    async fn test_batching_flushes_on_size() {
        let config = UnifierConfig {
            batch_size: 2,
            ..Default::default()
        };
        let vector = Arc::new(InMemoryVectorStore::new());
        let memory = UnifiedMemory::new(
            Arc::new(HashEmbedder::default()),
            Arc::clone(&vector) as Arc<dyn VectorStore>,
            Arc::new(InMemoryGraphStore::new()),
            config,
        );

        let first = memory
            .store_memory("one", Map::new(), "knowledge")
            .await
            .unwrap();
        // Buffered, not yet visible to the raw store.
        assert!(vector.get_memory(&first).await.unwrap().is_none());

        memory
            .store_memory("two", Map::new(), "knowledge")
            .await
            .unwrap();
        // Hitting batch_size flushed both.
        assert!(vector.get_memory(&first).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_timer_flush() {
        let config = UnifierConfig {
            batch_size: 100,
            flush_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let vector = Arc::new(InMemoryVectorStore::new());
        let memory = UnifiedMemory::spawn(
            Arc::new(HashEmbedder::default()),
            Arc::clone(&vector) as Arc<dyn VectorStore>,
            Arc::new(InMemoryGraphStore::new()),
            config,
        );

        let id = memory
            .store_memory("timed", Map::new(), "knowledge")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(vector.get_memory(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_delete() {
        let memory = unifier();
        let id = memory
            .store_memory("cached fact", Map::new(), "knowledge")
            .await
            .unwrap();
        // Populate the cache through a search.
        memory
            .search_similar("cached", &SearchParams::with_limit(5))
            .await
            .unwrap();
        assert!(memory.get_memory(&id).await.unwrap().is_some());

        memory.delete_memory(&id).await.unwrap();
        assert!(memory.get_memory(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inject_and_extract() {
        let memory = unifier();
        let a = memory
            .store_memory("the deploy password rotates monthly", Map::new(), "knowledge")
            .await
            .unwrap();
        let b = memory
            .store_memory("rotation is handled by the ops agent", Map::new(), "knowledge")
            .await
            .unwrap();
        memory
            .create_relation(&a, &b, "related_to", Map::new())
            .await
            .unwrap();

        let mut task = Task::new("t1", "s1");
        task.history
            .push(Message::user_text("when does the deploy password rotate?"));

        let injected = memory.inject_memories(&mut task).await;
        assert!(injected >= 1);
        assert!(task
            .history
            .iter()
            .any(|m| m.name.as_deref() == Some("memory")));
        assert!(task
            .history
            .iter()
            .any(|m| m.name.as_deref() == Some("relation")));

        // Extraction stores the latest message with its role.
        task.history.push(Message::agent_text("monthly, on the 1st"));
        let extracted = memory.extract_memories(&task).await.unwrap();
        memory.flush().await;
        let stored = memory.get_memory(&extracted).await.unwrap().unwrap();
        assert_eq!(stored.memory_type, "message");
        assert_eq!(stored.metadata["role"], "agent");
    }

    #[tokio::test]
    async fn test_inject_without_user_message_is_noop() {
        let memory = unifier();
        let mut task = Task::new("t1", "s1");
        assert_eq!(memory.inject_memories(&mut task).await, 0);
        assert!(task.history.is_empty());
    }

    /// Vector store whose bulk path always fails but whose single-item path
    /// works, for exercising the flush fallback.
    struct FlakyBulkStore {
        inner: InMemoryVectorStore,
    }

    #[async_trait]
    impl VectorStore for FlakyBulkStore {
        async fn store_memory(&self, memory: Memory) -> MemoryResult<String> {
            self.inner.store_memory(memory).await
        }

        async fn store_batch(&self, _memories: Vec<Memory>) -> MemoryResult<Vec<String>> {
            Err(MemoryError::Store("bulk endpoint down".into()))
        }

        async fn get_memory(&self, id: &str) -> MemoryResult<Option<Memory>> {
            self.inner.get_memory(id).await
        }

        async fn search_similar(
            &self,
            vector: &[f32],
            params: &SearchParams,
        ) -> MemoryResult<Vec<Memory>> {
            self.inner.search_similar(vector, params).await
        }

        async fn delete_memory(&self, id: &str) -> MemoryResult<()> {
            self.inner.delete_memory(id).await
        }

        async fn ping(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_bulk_failure_falls_back_to_per_item() {
        let memory = UnifiedMemory::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(FlakyBulkStore {
                inner: InMemoryVectorStore::new(),
            }),
            Arc::new(InMemoryGraphStore::new()),
            UnifierConfig::default(),
        );

        let id = memory
            .store_memory("resilient fact", Map::new(), "knowledge")
            .await
            .unwrap();
        memory.flush().await;
        assert!(memory.get_memory(&id).await.unwrap().is_some());
    }

    /// Stores that are entirely unavailable, for the degrade path.
    struct DownVectorStore;

    #[async_trait]
    impl VectorStore for DownVectorStore {
        async fn store_memory(&self, _memory: Memory) -> MemoryResult<String> {
            Err(MemoryError::Unavailable("vector store down".into()))
        }

        async fn get_memory(&self, _id: &str) -> MemoryResult<Option<Memory>> {
            Err(MemoryError::Unavailable("vector store down".into()))
        }

        async fn search_similar(
            &self,
            _vector: &[f32],
            _params: &SearchParams,
        ) -> MemoryResult<Vec<Memory>> {
            Err(MemoryError::Unavailable("vector store down".into()))
        }

        async fn delete_memory(&self, _id: &str) -> MemoryResult<()> {
            Err(MemoryError::Unavailable("vector store down".into()))
        }

        async fn ping(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_outage_degrades_inject_to_noop() {
        let memory = UnifiedMemory::new(
            Arc::new(HashEmbedder::default()),
            Arc::new(DownVectorStore),
            Arc::new(InMemoryGraphStore::new()),
            UnifierConfig::default(),
        );
        assert!(!memory.healthy().await);

        let mut task = Task::new("t1", "s1");
        task.history.push(Message::user_text("anything"));
        let before = task.history.len();

        assert_eq!(memory.inject_memories(&mut task).await, 0);
        assert_eq!(task.history.len(), before);
        assert!(memory.extract_memories(&task).await.is_none());
    }
}
