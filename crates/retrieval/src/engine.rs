use crate::config::RetrievalConfig;
use crate::error::Result;
use futures::stream::{self, StreamExt};
use repolens_code_chunker::{Chunk, ChunkId, Chunker};
use repolens_dense_index::{
    query_with_timeout, DenseIndex, DensePoint, EmbeddingProvider,
};
use repolens_search::{Provenance, RrfFusion};
use repolens_session::{IndexedChunk, SessionIndexes, SessionRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// What ingesting a document did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Content hash matched the manifest; nothing touched
    Unchanged,
    /// Document (re)indexed with this many chunks
    Indexed { chunk_count: usize },
}

/// A chunk returned from hybrid retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f64,
    pub provenance: Provenance,
}

/// Tally from a multi-file ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// Summary of a session's indexed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub documents: usize,
    pub chunks: usize,
}

/// Answer to "is this session already indexed?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    /// A manifest for the session has been persisted
    pub exists: bool,
    /// Indexed content is present (for the requested language, when given)
    pub has_index: bool,
    /// Distinct languages across the session's documents, sorted
    pub languages: Vec<String>,
}

/// Hybrid retrieval over session-scoped indexes.
///
/// Ingestion chunks a document, embeds the chunks in bounded concurrent
/// batches, and updates the sparse index, the dense index, and the manifest
/// under one session lock. Retrieval queries both sides, fuses by rank, and
/// maps ids back to chunk payloads.
pub struct RetrievalEngine {
    chunker: Chunker,
    registry: Arc<SessionRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    fusion: RrfFusion,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        registry: Arc<SessionRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chunker: Chunker::with_defaults(),
            registry,
            embedder,
            fusion: RrfFusion::new(config.rrf_k),
            config,
        })
    }

    /// Replace the default chunker configuration
    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Index one document into a session.
    ///
    /// Idempotent: unchanged content is detected by hash and skipped.
    /// Changed content first drops the document's previous chunks from both
    /// indexes, then indexes the new ones. Embedding failures degrade the
    /// document to sparse-only rather than failing the ingest.
    pub async fn ingest_document(
        &self,
        session_id: &str,
        file_path: &str,
        content: &str,
    ) -> Result<IngestOutcome> {
        let handle = self.registry.get_or_open(session_id).await?;
        let mut indexes = handle.lock().await;

        if indexes.manifest.is_current(file_path, content) {
            log::debug!("{file_path} unchanged in session {session_id}, skipping");
            return Ok(IngestOutcome::Unchanged);
        }

        let stale_ids = indexes.manifest.chunk_ids_for(file_path);
        for chunk_id in &stale_ids {
            indexes.sparse.remove(chunk_id);
        }
        indexes.dense.remove(&stale_ids).await?;

        let chunks = self.chunker.chunk_file(file_path, content);
        let texts: Vec<String> = chunks.iter().map(Chunk::indexable_text).collect();
        let vectors = self.embed_all(&texts).await;

        let mut records = Vec::with_capacity(chunks.len());
        let mut points = Vec::new();
        for (position, chunk) in chunks.into_iter().enumerate() {
            let vector = vectors.as_ref().map(|vs| vs[position].clone());
            indexes.sparse.insert(chunk.id.clone(), &texts[position]);
            if let Some(vector) = &vector {
                points.push(DensePoint::new(chunk.id.clone(), vector.clone()));
            }
            records.push(IndexedChunk { chunk, vector });
        }
        if !points.is_empty() {
            indexes.dense.upsert(points).await?;
        }

        let chunk_count = records.len();
        indexes
            .manifest
            .upsert_document(file_path, content, records);
        self.registry.store().save(&indexes.manifest)?;

        log::info!(
            "indexed {file_path} into session {session_id}: {chunk_count} chunks"
        );
        Ok(IngestOutcome::Indexed { chunk_count })
    }

    /// Ingest several files, tallying what was indexed vs skipped
    pub async fn ingest_files(
        &self,
        session_id: &str,
        files: &[(String, String)],
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for (path, content) in files {
            match self.ingest_document(session_id, path, content).await? {
                IngestOutcome::Unchanged => report.skipped += 1,
                IngestOutcome::Indexed { .. } => report.indexed += 1,
            }
        }
        Ok(report)
    }

    /// Hybrid retrieval for one query within one session.
    ///
    /// An empty session yields an empty list. A slow or failing dense side
    /// degrades to sparse-only results.
    pub async fn retrieve(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<Vec<RetrievedChunk>> {
        let handle = self.registry.get_or_open(session_id).await?;
        let indexes = handle.lock().await;

        if indexes.sparse.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.config.candidate_count();

        let sparse_ids: Vec<ChunkId> = indexes
            .sparse
            .query(query, candidates)
            .into_iter()
            .map(|hit| hit.chunk_id)
            .collect();

        let dense_ids = self.dense_candidates(&indexes, query, candidates).await;

        let fused = self.fusion.fuse(&dense_ids, &sparse_ids);

        let by_id = chunk_lookup(&indexes);
        let results = fused
            .into_iter()
            .filter(|hit| hit.score >= self.config.min_fused_score)
            .take(self.config.top_k)
            .filter_map(|hit| {
                by_id.get(&hit.chunk_id).map(|&chunk| RetrievedChunk {
                    chunk: chunk.clone(),
                    score: hit.score,
                    provenance: hit.provenance,
                })
            })
            .collect();

        Ok(results)
    }

    /// Probe a session's index without modifying it.
    ///
    /// With a language, `has_index` means that language has indexed
    /// documents; without one, any indexed document counts.
    pub async fn check_index(
        &self,
        session_id: &str,
        language: Option<&str>,
    ) -> Result<IndexStatus> {
        if !self.registry.store().exists(session_id) {
            return Ok(IndexStatus {
                exists: false,
                has_index: false,
                languages: Vec::new(),
            });
        }

        let handle = self.registry.get_or_open(session_id).await?;
        let indexes = handle.lock().await;
        let languages = indexes.manifest.languages();
        let has_index = match language {
            Some(lang) => languages.iter().any(|l| l == lang),
            None => indexes.manifest.document_count() > 0,
        };
        Ok(IndexStatus {
            exists: true,
            has_index,
            languages,
        })
    }

    /// What a session currently has indexed
    pub async fn session_status(&self, session_id: &str) -> Result<SessionStatus> {
        let handle = self.registry.get_or_open(session_id).await?;
        let indexes = handle.lock().await;
        Ok(SessionStatus {
            documents: indexes.manifest.document_count(),
            chunks: indexes.manifest.chunk_count(),
        })
    }

    async fn dense_candidates(
        &self,
        indexes: &SessionIndexes,
        query: &str,
        candidates: usize,
    ) -> Vec<ChunkId> {
        let query_text = [query.to_string()];
        let embed = self.embedder.embed(&query_text);
        let vector = match tokio::time::timeout(self.config.dense_timeout, embed).await {
            Ok(Ok(mut vectors)) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(Ok(_)) | Ok(Err(_)) => {
                log::warn!("query embedding unavailable, sparse-only retrieval");
                return Vec::new();
            }
            Err(_) => {
                log::warn!("query embedding timed out, sparse-only retrieval");
                return Vec::new();
            }
        };

        query_with_timeout(
            &indexes.dense,
            &vector,
            candidates,
            self.config.dense_timeout,
        )
        .await
        .into_iter()
        .map(|hit| hit.chunk_id)
        .collect()
    }

    /// Embed chunk texts in batches with bounded concurrency, preserving
    /// order. Returns `None` when any batch fails.
    async fn embed_all(&self, texts: &[String]) -> Option<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Some(Vec::new());
        }

        let batches: Vec<Vec<String>> = texts
            .chunks(self.config.embed_batch_size)
            .map(<[String]>::to_vec)
            .collect();

        let results: Vec<_> = stream::iter(batches)
            .map(|batch| {
                let embedder = Arc::clone(&self.embedder);
                async move { embedder.embed(&batch).await }
            })
            .buffered(self.config.embed_concurrency)
            .collect()
            .await;

        let mut vectors = Vec::with_capacity(texts.len());
        for result in results {
            match result {
                Ok(batch) => vectors.extend(batch),
                Err(e) => {
                    log::warn!("embedding batch failed, indexing sparse-only: {e}");
                    return None;
                }
            }
        }
        // A backend that truncates a batch is as broken as one that errors
        if vectors.len() != texts.len() {
            log::warn!(
                "embedding returned {} vectors for {} texts, indexing sparse-only",
                vectors.len(),
                texts.len()
            );
            return None;
        }
        Some(vectors)
    }
}

fn chunk_lookup(indexes: &SessionIndexes) -> HashMap<&ChunkId, &Chunk> {
    indexes
        .manifest
        .documents
        .values()
        .flat_map(|record| record.chunks.iter())
        .map(|indexed| (&indexed.chunk.id, &indexed.chunk))
        .collect()
}
