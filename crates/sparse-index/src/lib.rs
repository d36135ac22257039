//! # Repolens Sparse Index
//!
//! In-memory Okapi BM25 retrieval over code chunks.
//!
//! The index tokenizes code-aware: identifiers match both as a whole and by
//! their camelCase/snake_case parts. Rankings are fully deterministic, with
//! score ties broken by insertion order, which keeps downstream rank fusion
//! reproducible.

mod bm25;
mod tokenizer;

pub use bm25::{Bm25Params, SparseHit, SparseIndex};
pub use tokenizer::tokenize;
