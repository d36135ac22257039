use repolens_code_chunker::ChunkId;
use serde::{Deserialize, Serialize};

/// A chunk embedding ready for upsert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensePoint {
    pub chunk_id: ChunkId,
    pub vector: Vec<f32>,
}

impl DensePoint {
    pub fn new(chunk_id: ChunkId, vector: Vec<f32>) -> Self {
        Self { chunk_id, vector }
    }
}

/// A scored dense-retrieval hit (cosine similarity, higher is better)
#[derive(Debug, Clone, PartialEq)]
pub struct DenseHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// Cosine similarity between two vectors of equal length.
///
/// Zero vectors yield 0.0 rather than NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
