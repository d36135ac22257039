//! # Repolens Dense Index
//!
//! Dense-retrieval traits plus a brute-force in-memory backend.
//!
//! The retrieval engine depends only on [`DenseIndex`] and
//! [`EmbeddingProvider`], so remote vector stores slot in without touching
//! the ranking code. [`query_with_timeout`] wraps any backend with a
//! deadline: a slow dense side degrades to sparse-only retrieval instead of
//! failing the turn.

mod error;
mod index;
mod provider;
mod types;

pub use error::{DenseIndexError, Result};
pub use index::{query_with_timeout, DenseIndex, InMemoryDenseIndex};
pub use provider::{EmbeddingProvider, StubEmbeddingProvider};
pub use types::{cosine_similarity, DenseHit, DensePoint};
