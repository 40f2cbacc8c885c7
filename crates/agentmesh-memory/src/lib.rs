//! # agentmesh-memory
//!
//! Unified memory for AgentMesh agents: a single façade combining a vector
//! store (semantic similarity over embeddings) with a graph store (typed
//! directed relations), plus the two task-driven operations the framework
//! uses — injecting relevant context into a task and extracting durable
//! knowledge from finished ones.
//!
//! Concrete database drivers and model-backed embedders plug in behind the
//! [`VectorStore`], [`GraphStore`], and [`Embedder`] traits; the in-memory
//! reference stores implement the same semantics for tests and small
//! deployments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentmesh_memory::{
//!     HashEmbedder, InMemoryGraphStore, InMemoryVectorStore, SearchParams, UnifiedMemory,
//!     UnifierConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let memory = UnifiedMemory::spawn(
//!         Arc::new(HashEmbedder::default()),
//!         Arc::new(InMemoryVectorStore::new()),
//!         Arc::new(InMemoryGraphStore::new()),
//!         UnifierConfig::default(),
//!     );
//!
//!     let id = memory
//!         .store_memory("hello world", Default::default(), "knowledge")
//!         .await?;
//!     let hits = memory.search_similar("hello", &SearchParams::with_limit(5)).await?;
//!     assert!(hits.iter().any(|m| m.id == id));
//!     Ok(())
//! }
//! ```

pub mod embed;
pub mod error;
pub mod graph;
pub mod types;
pub mod unifier;
pub mod vector;

// Re-export primary types
pub use embed::{cosine_similarity, Embedder, HashEmbedder};
pub use error::{MemoryError, MemoryResult};
pub use graph::{GraphStore, InMemoryGraphStore};
pub use types::{Memory, Relation};
pub use unifier::{UnifiedMemory, UnifierConfig};
pub use vector::{FieldFilter, FilterOp, InMemoryVectorStore, SearchParams, VectorStore};
