//! Memory layer error types.

use thiserror::Error;

/// Errors from the memory stores and the unifier.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backing store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(String),

    /// The embedder failed to produce a vector.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The referenced memory record does not exist.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// The backing store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Memory result type alias.
pub type MemoryResult<T> = Result<T, MemoryError>;
