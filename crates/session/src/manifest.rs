use repolens_code_chunker::{Chunk, Language};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A chunk as stored in the manifest, with its embedding when one was
/// produced. Persisting vectors lets a session reopen without re-embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// One ingested document inside a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub file_path: String,
    /// Language name detected from the file extension
    pub language: String,
    /// SHA-256 of the document content, hex-encoded. Matching hashes make
    /// re-ingestion a no-op.
    pub content_hash: String,
    pub indexed_at_unix_ms: u64,
    pub chunks: Vec<IndexedChunk>,
}

/// Durable record of everything indexed for one session.
///
/// Documents are keyed by file path in a sorted map, so the serialized form
/// and the rebuild order are both stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionManifest {
    pub schema_version: u32,
    pub session_id: String,
    /// Identity of the repository this session analyzes, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub created_at_unix_ms: u64,
    #[serde(default)]
    pub last_access_at_unix_ms: u64,
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentRecord>,
}

impl SessionManifest {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = now_unix_ms();
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            session_id: session_id.into(),
            repo: None,
            created_at_unix_ms: now,
            last_access_at_unix_ms: now,
            documents: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// Bump the last-access timestamp
    pub fn touch(&mut self) {
        self.last_access_at_unix_ms = now_unix_ms();
    }

    /// Whether `content` is already indexed for `file_path` unchanged
    #[must_use]
    pub fn is_current(&self, file_path: &str, content: &str) -> bool {
        self.documents
            .get(file_path)
            .is_some_and(|doc| doc.content_hash == content_hash(content))
    }

    /// Record a document, replacing any previous record for the same path
    pub fn upsert_document(
        &mut self,
        file_path: impl Into<String>,
        content: &str,
        chunks: Vec<IndexedChunk>,
    ) {
        let file_path = file_path.into();
        let record = DocumentRecord {
            language: Language::from_path(&file_path).as_str().to_string(),
            file_path: file_path.clone(),
            content_hash: content_hash(content),
            indexed_at_unix_ms: now_unix_ms(),
            chunks,
        };
        self.documents.insert(file_path, record);
        self.touch();
    }

    /// Distinct languages across indexed documents, sorted
    #[must_use]
    pub fn languages(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .documents
            .values()
            .map(|d| d.language.as_str())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Chunk ids previously recorded for a path, used to drop stale index
    /// entries before re-ingesting a changed document
    #[must_use]
    pub fn chunk_ids_for(&self, file_path: &str) -> Vec<repolens_code_chunker::ChunkId> {
        self.documents
            .get(file_path)
            .map(|doc| doc.chunks.iter().map(|c| c.chunk.id.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.documents.values().map(|d| d.chunks.len()).sum()
    }
}

/// SHA-256 of document content, hex-encoded
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
