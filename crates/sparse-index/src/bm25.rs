use crate::tokenizer::tokenize;
use repolens_code_chunker::ChunkId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Okapi BM25 tuning parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f32,
    /// Document-length normalization strength
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// A scored sparse-retrieval hit
#[derive(Debug, Clone, PartialEq)]
pub struct SparseHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}

#[derive(Debug)]
struct DocEntry {
    length: usize,
    /// Insertion sequence, used as the deterministic tie-breaker
    seq: u64,
    /// Term frequencies, kept for O(terms) removal
    terms: Vec<(String, u32)>,
}

/// In-memory Okapi BM25 index over chunk texts.
///
/// Documents are keyed by [`ChunkId`]; inserting an id that already exists
/// replaces the previous document. Score ties rank by insertion order, so
/// the same sequence of operations always yields the same ranking.
#[derive(Debug)]
pub struct SparseIndex {
    params: Bm25Params,
    postings: HashMap<String, HashMap<ChunkId, u32>>,
    docs: HashMap<ChunkId, DocEntry>,
    total_length: usize,
    next_seq: u64,
}

impl SparseIndex {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            postings: HashMap::new(),
            docs: HashMap::new(),
            total_length: 0,
            next_seq: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Bm25Params::default())
    }

    /// Number of indexed documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Index a document, replacing any previous document with the same id
    pub fn insert(&mut self, chunk_id: ChunkId, text: &str) {
        self.remove(&chunk_id);

        let tokens = tokenize(text);
        let length = tokens.len();

        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *frequencies.entry(token).or_insert(0) += 1;
        }

        let terms: Vec<(String, u32)> = frequencies.into_iter().collect();
        for (term, tf) in &terms {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(chunk_id.clone(), *tf);
        }

        self.total_length += length;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.docs.insert(chunk_id, DocEntry { length, seq, terms });
    }

    /// Drop a document from the index; unknown ids are a no-op
    pub fn remove(&mut self, chunk_id: &ChunkId) {
        let Some(entry) = self.docs.remove(chunk_id) else {
            return;
        };

        self.total_length -= entry.length;
        for (term, _) in &entry.terms {
            if let Some(docs) = self.postings.get_mut(term) {
                docs.remove(chunk_id);
                if docs.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
    }

    /// Rank documents against a query, best first.
    ///
    /// Returns at most `top_k` hits with positive scores. Ties are broken by
    /// insertion order.
    #[must_use]
    pub fn query(&self, query: &str, top_k: usize) -> Vec<SparseHit> {
        if self.docs.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let total_docs = self.docs.len() as f32;
        let avg_length = self.total_length as f32 / total_docs;

        let mut scores: HashMap<&ChunkId, f32> = HashMap::new();
        for term in tokenize(query) {
            let Some(docs) = self.postings.get(&term) else {
                continue;
            };

            let df = docs.len() as f32;
            let idf = (1.0 + (total_docs - df + 0.5) / (df + 0.5)).ln();

            for (chunk_id, tf) in docs {
                let entry = &self.docs[chunk_id];
                let tf = *tf as f32;
                let norm = 1.0 - self.params.b
                    + self.params.b * entry.length as f32 / avg_length;
                let contribution =
                    idf * tf * (self.params.k1 + 1.0) / (tf + self.params.k1 * norm);
                *scores.entry(chunk_id).or_insert(0.0) += contribution;
            }
        }

        let mut hits: Vec<(&ChunkId, f32)> =
            scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.docs[a.0].seq.cmp(&self.docs[b.0].seq))
        });
        hits.truncate(top_k);

        hits.into_iter()
            .map(|(chunk_id, score)| SparseHit {
                chunk_id: chunk_id.clone(),
                score,
            })
            .collect()
    }
}

impl Default for SparseIndex {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(name: &str) -> ChunkId {
        ChunkId::new(name)
    }

    #[test]
    fn matching_function_ranks_first() {
        let mut index = SparseIndex::with_defaults();
        index.insert(
            id("a.py:1:3"),
            "def parse_config(path):\n    return toml.load(path)",
        );
        index.insert(
            id("a.py:5:8"),
            "def download_remote_archive(url):\n    response = http.get(url)\n    return response.body",
        );
        index.insert(
            id("a.py:10:12"),
            "def render_template(name, context):\n    return engine.render(name, context)",
        );

        let hits = index.query("download archive from url", 3);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].chunk_id, id("a.py:5:8"));
    }

    #[test]
    fn reinsert_replaces_previous_document() {
        let mut index = SparseIndex::with_defaults();
        index.insert(id("f.rs:1:5"), "fn alpha() { alpha_helper() }");
        index.insert(id("f.rs:1:5"), "fn beta() { beta_helper() }");

        assert_eq!(index.len(), 1);
        assert!(index.query("alpha", 5).is_empty());
        assert_eq!(index.query("beta", 5)[0].chunk_id, id("f.rs:1:5"));
    }

    #[test]
    fn remove_is_idempotent_and_cleans_postings() {
        let mut index = SparseIndex::with_defaults();
        index.insert(id("x:1:1"), "fn solo() {}");
        index.remove(&id("x:1:1"));
        index.remove(&id("x:1:1"));

        assert!(index.is_empty());
        assert!(index.query("solo", 5).is_empty());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut index = SparseIndex::with_defaults();
        // Identical documents score identically
        index.insert(id("b:1:1"), "shared token text");
        index.insert(id("a:1:1"), "shared token text");

        let hits = index.query("shared token", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, id("b:1:1"));
        assert_eq!(hits[1].chunk_id, id("a:1:1"));
    }

    #[test]
    fn unrelated_queries_return_nothing() {
        let mut index = SparseIndex::with_defaults();
        index.insert(id("a:1:1"), "fn compute() { value * 2 }");
        assert!(index.query("zebra giraffe", 5).is_empty());
    }

    #[test]
    fn top_k_limits_results() {
        let mut index = SparseIndex::with_defaults();
        for i in 0..10 {
            index.insert(id(&format!("f:{i}:{i}")), "common term document");
        }
        assert_eq!(index.query("common", 3).len(), 3);
    }
}
