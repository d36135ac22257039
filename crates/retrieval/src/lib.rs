//! # Repolens Retrieval
//!
//! The per-turn retrieval engine: hybrid search over session indexes with a
//! bounded just-in-time fetch loop.
//!
//! ```text
//! question
//!   │
//!   ├──> Rewrite      conversational query → search keywords
//!   ├──> Retrieve     BM25 + dense, fused by reciprocal rank
//!   ├──> Evaluate     enough relevant context?
//!   │      ├─ yes ──> Respond (context_complete = true)
//!   │      └─ no ───> Fetch one file → Ingest → Retrieve again
//!   │                 (at most max_fetches_per_turn times)
//!   └──> Respond
//! ```
//!
//! Degradation is deliberate everywhere: a failing rewriter falls back to
//! the raw query, a slow dense backend falls back to sparse-only results,
//! and a misbehaving source burns its fetch budget instead of stalling the
//! turn.

mod config;
mod engine;
mod error;
mod orchestrator;
mod providers;
mod retry;
mod rewrite;

pub use config::RetrievalConfig;
pub use engine::{
    IndexStatus, IngestOutcome, IngestReport, RetrievalEngine, RetrievedChunk, SessionStatus,
};
pub use error::{CompletionError, Result, RetrievalError, SourceError};
pub use orchestrator::{AgentAction, Orchestrator, TurnOutcome};
pub use providers::{CompletionProvider, RepoSource};
pub use retry::RetryPolicy;
pub use rewrite::rewrite_query;
