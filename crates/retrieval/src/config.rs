use crate::error::{Result, RetrievalError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for one retrieval engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results returned per turn after fusion
    pub top_k: usize,

    /// Each retriever is queried for `top_k * oversample` candidates so
    /// fusion has enough overlap to work with
    pub oversample: usize,

    /// Reciprocal-rank fusion constant
    pub rrf_k: f64,

    /// Fewer fused results than this marks the context incomplete
    pub min_results: usize,

    /// Fused hits scoring below this are dropped
    pub min_fused_score: f64,

    /// Hard cap on source fetches within a single turn
    pub max_fetches_per_turn: usize,

    /// Deadline for the dense backend before degrading to sparse-only
    pub dense_timeout: Duration,

    /// Texts per embedding request
    pub embed_batch_size: usize,

    /// Embedding requests in flight at once
    pub embed_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            oversample: 5,
            rrf_k: 60.0,
            min_results: 1,
            min_fused_score: 0.01,
            max_fetches_per_turn: 2,
            dense_timeout: Duration::from_secs(30),
            embed_batch_size: 50,
            embed_concurrency: 5,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RetrievalError::InvalidConfig("top_k must be > 0".into()));
        }
        if self.oversample == 0 {
            return Err(RetrievalError::InvalidConfig(
                "oversample must be > 0".into(),
            ));
        }
        if self.embed_batch_size == 0 || self.embed_concurrency == 0 {
            return Err(RetrievalError::InvalidConfig(
                "embedding batch size and concurrency must be > 0".into(),
            ));
        }
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(RetrievalError::InvalidConfig(
                "rrf_k must be a non-negative finite number".into(),
            ));
        }
        Ok(())
    }

    /// Candidate count requested from each retriever
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.top_k.saturating_mul(self.oversample)
    }
}
