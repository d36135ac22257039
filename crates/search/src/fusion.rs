use repolens_code_chunker::ChunkId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;

/// Which retriever(s) surfaced a fused result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Dense,
    Sparse,
    Both,
}

/// A chunk ranked by reciprocal-rank fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedHit {
    pub chunk_id: ChunkId,
    /// Sum of 1/(rank + k) over the lists the chunk appears in
    pub score: f64,
    /// 1-based rank in the dense list, if present there
    pub dense_rank: Option<usize>,
    /// 1-based rank in the sparse list, if present there
    pub sparse_rank: Option<usize>,
    pub provenance: Provenance,
}

/// Reciprocal-rank fusion of a dense and a sparse ranking.
///
/// Unweighted: each list contributes `1 / (rank + k)` with 1-based ranks.
/// Only ranks matter, so backend score scales never leak into the fused
/// ordering. Equal fused scores break by dense rank, then sparse rank, then
/// the order chunks were first seen, making the output bit-identical across
/// runs for the same inputs.
#[derive(Debug, Clone, Copy)]
pub struct RrfFusion {
    k: f64,
}

impl RrfFusion {
    pub const DEFAULT_K: f64 = 60.0;

    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn fuse(&self, dense: &[ChunkId], sparse: &[ChunkId]) -> Vec<FusedHit> {
        struct Entry {
            first_seen: usize,
            dense_rank: Option<usize>,
            sparse_rank: Option<usize>,
        }

        let mut entries: HashMap<&ChunkId, Entry> = HashMap::new();
        let mut seen = 0usize;

        for (idx, chunk_id) in dense.iter().enumerate() {
            match entries.entry(chunk_id) {
                MapEntry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    if entry.dense_rank.is_none() {
                        entry.dense_rank = Some(idx + 1);
                    }
                }
                MapEntry::Vacant(vacant) => {
                    seen += 1;
                    vacant.insert(Entry {
                        first_seen: seen,
                        dense_rank: Some(idx + 1),
                        sparse_rank: None,
                    });
                }
            }
        }

        for (idx, chunk_id) in sparse.iter().enumerate() {
            match entries.entry(chunk_id) {
                MapEntry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    if entry.sparse_rank.is_none() {
                        entry.sparse_rank = Some(idx + 1);
                    }
                }
                MapEntry::Vacant(vacant) => {
                    seen += 1;
                    vacant.insert(Entry {
                        first_seen: seen,
                        dense_rank: None,
                        sparse_rank: Some(idx + 1),
                    });
                }
            }
        }

        let mut hits: Vec<(usize, FusedHit)> = entries
            .into_iter()
            .map(|(chunk_id, entry)| {
                let mut score = 0.0f64;
                if let Some(rank) = entry.dense_rank {
                    score += 1.0 / (rank as f64 + self.k);
                }
                if let Some(rank) = entry.sparse_rank {
                    score += 1.0 / (rank as f64 + self.k);
                }
                let provenance = match (entry.dense_rank, entry.sparse_rank) {
                    (Some(_), Some(_)) => Provenance::Both,
                    (Some(_), None) => Provenance::Dense,
                    _ => Provenance::Sparse,
                };
                (
                    entry.first_seen,
                    FusedHit {
                        chunk_id: chunk_id.clone(),
                        score,
                        dense_rank: entry.dense_rank,
                        sparse_rank: entry.sparse_rank,
                        provenance,
                    },
                )
            })
            .collect();

        hits.sort_by(|(seen_a, a), (seen_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| rank_or_max(a.dense_rank).cmp(&rank_or_max(b.dense_rank)))
                .then_with(|| rank_or_max(a.sparse_rank).cmp(&rank_or_max(b.sparse_rank)))
                .then_with(|| seen_a.cmp(seen_b))
        });

        hits.into_iter().map(|(_, hit)| hit).collect()
    }
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new(Self::DEFAULT_K)
    }
}

fn rank_or_max(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}
