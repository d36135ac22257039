use crate::error::{DenseIndexError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Produces embedding vectors for chunk texts and queries.
///
/// Implementations wrap whatever model backend is in use; callers only rely
/// on `dimension` being stable across calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of produced vectors
    fn dimension(&self) -> usize;
}

/// Deterministic hash-based embeddings for tests and offline runs.
///
/// Not semantically meaningful, but identical text always maps to the same
/// vector, which is all the retrieval plumbing needs to be exercised.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dimension: usize,
}

impl StubEmbeddingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(DenseIndexError::EmbeddingError(
                "stub dimension must be > 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter = 0u64;
        while vector.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(counter.to_le_bytes());
            hasher.update(text.as_bytes());
            let digest = hasher.finalize();
            for pair in digest.chunks_exact(2) {
                if vector.len() == self.dimension {
                    break;
                }
                let raw = u16::from_le_bytes([pair[0], pair[1]]);
                vector.push(f32::from(raw) / f32::from(u16::MAX) - 0.5);
            }
            counter += 1;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
