use crate::error::Result;
use crate::manifest::SessionManifest;
use crate::store::SessionStore;
use lru::LruCache;
use repolens_dense_index::{DenseIndex, DensePoint, InMemoryDenseIndex};
use repolens_sparse_index::SparseIndex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The live indexes and manifest for one session.
///
/// All mutation for a session happens while holding the handle's lock, so
/// sparse, dense, and manifest state never drift apart.
pub struct SessionIndexes {
    pub manifest: SessionManifest,
    pub sparse: SparseIndex,
    pub dense: InMemoryDenseIndex,
}

pub type IndexHandle = Arc<Mutex<SessionIndexes>>;

/// Keeps a bounded number of sessions hot in memory.
///
/// Sessions evicted by the LRU are not lost: their manifests live on disk
/// and the indexes are rebuilt from persisted chunks on the next access.
/// Concurrent turns for different sessions proceed independently; turns for
/// the same session serialize on its handle.
pub struct SessionRegistry {
    store: SessionStore,
    dense_dimension: usize,
    handles: Mutex<LruCache<String, IndexHandle>>,
}

impl SessionRegistry {
    pub fn new(store: SessionStore, capacity: NonZeroUsize, dense_dimension: usize) -> Self {
        Self {
            store,
            dense_dimension,
            handles: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Fetch the handle for a session, rebuilding its indexes from the
    /// manifest if it is not resident
    pub async fn get_or_open(&self, session_id: &str) -> Result<IndexHandle> {
        {
            let mut handles = self.handles.lock().await;
            if let Some(handle) = handles.get(session_id) {
                return Ok(Arc::clone(handle));
            }
        }

        // Rebuild outside the registry lock; a racing open of the same
        // session is resolved below by whoever inserts second losing.
        let manifest = self.store.load_or_create(session_id)?;
        let indexes = self.rebuild(manifest).await?;
        let handle: IndexHandle = Arc::new(Mutex::new(indexes));

        let mut handles = self.handles.lock().await;
        if let Some(existing) = handles.get(session_id) {
            return Ok(Arc::clone(existing));
        }
        handles.put(session_id.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop a session from memory and disk
    pub async fn purge(&self, session_id: &str) -> Result<()> {
        self.handles.lock().await.pop(session_id);
        self.store.purge(session_id)
    }

    /// Number of sessions currently resident
    pub async fn resident_sessions(&self) -> usize {
        self.handles.lock().await.len()
    }

    async fn rebuild(&self, manifest: SessionManifest) -> Result<SessionIndexes> {
        let mut sparse = SparseIndex::with_defaults();
        let mut dense = InMemoryDenseIndex::new(self.dense_dimension);

        // BTreeMap order makes the rebuild, and thus tie-breaking,
        // reproducible
        for record in manifest.documents.values() {
            let mut points = Vec::new();
            for indexed in &record.chunks {
                sparse.insert(indexed.chunk.id.clone(), &indexed.chunk.indexable_text());
                if let Some(vector) = &indexed.vector {
                    points.push(DensePoint::new(indexed.chunk.id.clone(), vector.clone()));
                }
            }
            if !points.is_empty() {
                dense
                    .upsert(points)
                    .await
                    .map_err(|e| crate::error::SessionError::CorruptManifest(format!(
                        "{}: {e}",
                        manifest.session_id
                    )))?;
            }
        }

        Ok(SessionIndexes {
            manifest,
            sparse,
            dense,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::IndexedChunk;
    use pretty_assertions::assert_eq;
    use repolens_code_chunker::{Chunk, ChunkKind};

    fn registry(capacity: usize, dir: &tempfile::TempDir) -> SessionRegistry {
        SessionRegistry::new(
            SessionStore::new(dir.path()),
            NonZeroUsize::new(capacity).unwrap(),
            4,
        )
    }

    fn indexed(path: &str, text: &str, vector: Option<Vec<f32>>) -> IndexedChunk {
        IndexedChunk {
            chunk: Chunk::new(path, 1, 1, text, ChunkKind::RawBlock),
            vector,
        }
    }

    #[tokio::test]
    async fn open_rebuilds_indexes_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(4, &dir);

        let mut manifest = SessionManifest::new("s1");
        manifest.upsert_document(
            "f.rs",
            "fn alpha() {}",
            vec![indexed("f.rs", "fn alpha() {}", Some(vec![1.0, 0.0, 0.0, 0.0]))],
        );
        registry.store().save(&manifest).unwrap();

        let handle = registry.get_or_open("s1").await.unwrap();
        let indexes = handle.lock().await;
        assert_eq!(indexes.sparse.len(), 1);
        assert_eq!(indexes.dense.count().await.unwrap(), 1);
        assert!(!indexes.sparse.query("alpha", 5).is_empty());
    }

    #[tokio::test]
    async fn same_session_returns_the_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(4, &dir);

        let a = registry.get_or_open("s1").await.unwrap();
        let b = registry.get_or_open("s1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn lru_evicts_cold_sessions_but_state_survives() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(2, &dir);

        let handle = registry.get_or_open("s1").await.unwrap();
        {
            let mut indexes = handle.lock().await;
            indexes.manifest.upsert_document(
                "f.rs",
                "fn keep() {}",
                vec![indexed("f.rs", "fn keep() {}", None)],
            );
            let manifest = indexes.manifest.clone();
            registry.store().save(&manifest).unwrap();
        }
        drop(handle);

        registry.get_or_open("s2").await.unwrap();
        registry.get_or_open("s3").await.unwrap();
        assert_eq!(registry.resident_sessions().await, 2);

        // s1 was evicted; reopening rebuilds from disk
        let reopened = registry.get_or_open("s1").await.unwrap();
        let indexes = reopened.lock().await;
        assert_eq!(indexes.manifest.document_count(), 1);
        assert_eq!(indexes.sparse.len(), 1);
    }

    #[tokio::test]
    async fn sessions_do_not_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(4, &dir);

        let a = registry.get_or_open("a").await.unwrap();
        {
            let mut indexes = a.lock().await;
            let text = "fn only_in_a() {}";
            indexes
                .sparse
                .insert(Chunk::new("a.rs", 1, 1, text, ChunkKind::Function).id, text);
        }

        let b = registry.get_or_open("b").await.unwrap();
        let indexes = b.lock().await;
        assert!(indexes.sparse.query("only_in_a", 5).is_empty());
    }

    #[tokio::test]
    async fn purge_removes_memory_and_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(4, &dir);

        let handle = registry.get_or_open("s1").await.unwrap();
        {
            let mut indexes = handle.lock().await;
            indexes
                .manifest
                .upsert_document("f.rs", "body", Vec::new());
            let manifest = indexes.manifest.clone();
            registry.store().save(&manifest).unwrap();
        }
        drop(handle);

        registry.purge("s1").await.unwrap();
        let reopened = registry.get_or_open("s1").await.unwrap();
        assert_eq!(reopened.lock().await.manifest.document_count(), 0);
    }
}
