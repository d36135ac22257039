use crate::error::{DenseIndexError, Result};
use crate::types::{cosine_similarity, DenseHit, DensePoint};
use async_trait::async_trait;
use repolens_code_chunker::ChunkId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

/// Storage-agnostic dense vector index.
///
/// Backends range from the bundled in-memory index to remote vector stores;
/// the retrieval engine only depends on this trait.
#[async_trait]
pub trait DenseIndex: Send + Sync {
    /// Insert or replace points by chunk id
    async fn upsert(&mut self, points: Vec<DensePoint>) -> Result<()>;

    /// Drop points; unknown ids are a no-op
    async fn remove(&mut self, chunk_ids: &[ChunkId]) -> Result<()>;

    /// Nearest neighbours of `vector` by cosine similarity, best first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<DenseHit>>;

    /// Number of stored points
    async fn count(&self) -> Result<usize>;
}

/// Brute-force in-memory dense index.
///
/// Exact cosine search in insertion order, so equal scores always rank the
/// same way. Fine up to tens of thousands of chunks, which covers a single
/// session's worth of repository files.
pub struct InMemoryDenseIndex {
    dimension: usize,
    /// Points in insertion order; replaced points keep their slot
    points: Vec<(ChunkId, Vec<f32>)>,
    by_id: HashMap<ChunkId, usize>,
}

impl InMemoryDenseIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            points: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(DenseIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DenseIndex for InMemoryDenseIndex {
    async fn upsert(&mut self, points: Vec<DensePoint>) -> Result<()> {
        for point in points {
            self.check_dimension(&point.vector)?;
            match self.by_id.get(&point.chunk_id) {
                Some(&slot) => self.points[slot].1 = point.vector,
                None => {
                    self.by_id.insert(point.chunk_id.clone(), self.points.len());
                    self.points.push((point.chunk_id, point.vector));
                }
            }
        }
        Ok(())
    }

    async fn remove(&mut self, chunk_ids: &[ChunkId]) -> Result<()> {
        for chunk_id in chunk_ids {
            if let Some(slot) = self.by_id.remove(chunk_id) {
                self.points.remove(slot);
                // Reindex slots after the removed one
                for s in self.by_id.values_mut() {
                    if *s > slot {
                        *s -= 1;
                    }
                }
            }
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<DenseHit>> {
        self.check_dimension(vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(usize, DenseHit)> = self
            .points
            .iter()
            .enumerate()
            .map(|(order, (chunk_id, stored))| {
                let score = cosine_similarity(vector, stored);
                (
                    order,
                    DenseHit {
                        chunk_id: chunk_id.clone(),
                        score,
                    },
                )
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(top_k);

        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.points.len())
    }
}

/// Query a dense backend with a deadline.
///
/// A slow or failing backend degrades to an empty hit list so hybrid
/// retrieval can continue on sparse results alone.
pub async fn query_with_timeout(
    index: &dyn DenseIndex,
    vector: &[f32],
    top_k: usize,
    deadline: Duration,
) -> Vec<DenseHit> {
    match tokio::time::timeout(deadline, index.query(vector, top_k)).await {
        Ok(Ok(hits)) => hits,
        Ok(Err(e)) => {
            log::warn!("dense query failed, continuing sparse-only: {e}");
            Vec::new()
        }
        Err(_) => {
            log::warn!(
                "dense query exceeded {}ms, continuing sparse-only",
                deadline.as_millis()
            );
            Vec::new()
        }
    }
}
