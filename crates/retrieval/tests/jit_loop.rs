use async_trait::async_trait;
use repolens_dense_index::StubEmbeddingProvider;
use repolens_retrieval::{
    CompletionError, CompletionProvider, Orchestrator, RepoSource, RetrievalConfig,
    RetrievalEngine, RetryPolicy, SourceError,
};
use repolens_session::{SessionRegistry, SessionStore};
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DIMENSION: usize = 16;

/// Plays back canned completions in order; erroring once exhausted
struct ScriptedCompletion {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedCompletion {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CompletionError> {
        self.responses
            .lock()
            .expect("script lock")
            .pop_front()
            .ok_or_else(|| CompletionError::Backend("script exhausted".to_string()))
    }
}

struct MockSource {
    files: HashMap<String, String>,
    fetch_calls: AtomicUsize,
}

impl MockSource {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoSource for MockSource {
    async fn fetch_file(&self, path: &str) -> Result<String, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    async fn list_files(&self) -> Result<Vec<String>, SourceError> {
        let mut paths: Vec<String> = self.files.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

fn orchestrator(
    dir: &tempfile::TempDir,
    completion: Arc<ScriptedCompletion>,
    source: Arc<MockSource>,
) -> Orchestrator {
    let registry = Arc::new(SessionRegistry::new(
        SessionStore::new(dir.path()),
        NonZeroUsize::new(8).unwrap(),
        DIMENSION,
    ));
    let engine = Arc::new(
        RetrievalEngine::new(
            registry,
            Arc::new(StubEmbeddingProvider::new(DIMENSION).unwrap()),
            // A lone rank-1 hit from one list scores 1/(k+1) ~= 0.016, so
            // 0.02 keeps chunks that both lists agree on and drops
            // single-list noise from the stub embedder.
            RetrievalConfig {
                dense_timeout: Duration::from_millis(100),
                min_fused_score: 0.02,
                ..Default::default()
            },
        )
        .unwrap(),
    );
    Orchestrator::new(engine, completion, source).with_retry_policy(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    })
}

#[tokio::test]
async fn empty_session_yields_no_chunks_and_incomplete_context() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(&[
        r#"{"keywords": ["session", "registry"]}"#,
        r#"{"action": "answer_directly"}"#,
    ]));
    let source = Arc::new(MockSource::new(&[("src/lib.rs", "fn unrelated() {}")]));
    let orchestrator = orchestrator(&dir, completion, Arc::clone(&source));

    let outcome = orchestrator
        .run_turn("empty", "where is the session registry?")
        .await
        .unwrap();

    assert!(outcome.chunks.is_empty());
    assert!(!outcome.context_complete);
    assert!(outcome.fetched_files.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn thin_context_triggers_fetch_ingest_and_reretrieve() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(&[
        r#"{"keywords": ["alpha", "helper"]}"#,
        r#"{"action": "fetch_file", "path": "src/alpha.py"}"#,
    ]));
    let source = Arc::new(MockSource::new(&[(
        "src/alpha.py",
        "def alpha_helper(value):\n    return value * 2",
    )]));
    let orchestrator = orchestrator(&dir, completion, Arc::clone(&source));

    let outcome = orchestrator
        .run_turn("s1", "what does the alpha helper do?")
        .await
        .unwrap();

    assert!(outcome.context_complete);
    assert_eq!(outcome.fetched_files, vec!["src/alpha.py".to_string()]);
    assert!(!outcome.chunks.is_empty());
    assert!(outcome.chunks[0].chunk.text.contains("alpha_helper"));
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn fetch_cap_bounds_the_turn() {
    let dir = tempfile::tempdir().unwrap();
    // The agent keeps asking for files that do not exist
    let completion = Arc::new(ScriptedCompletion::new(&[
        r#"{"keywords": ["missing"]}"#,
        r#"{"action": "fetch_file", "path": "a.rs"}"#,
        r#"{"action": "fetch_file", "path": "b.rs"}"#,
        r#"{"action": "fetch_file", "path": "c.rs"}"#,
    ]));
    let source = Arc::new(MockSource::new(&[]));
    let orchestrator = orchestrator(&dir, completion, Arc::clone(&source));

    let outcome = orchestrator.run_turn("s1", "anything").await.unwrap();

    assert!(!outcome.context_complete);
    assert!(outcome.fetched_files.is_empty());
    // Default cap is 2; NotFound is permanent so each attempt is one call
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn agent_cannot_burn_the_cap_refetching_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let completion = Arc::new(ScriptedCompletion::new(&[
        r#"{"keywords": ["nothing", "relevant"]}"#,
        r#"{"action": "fetch_file", "path": "notes.txt"}"#,
        r#"{"action": "fetch_file", "path": "notes.txt"}"#,
    ]));
    // File exists but does not answer the query
    let source = Arc::new(MockSource::new(&[(
        "notes.txt",
        "unrelated prose about deployment windows",
    )]));
    let orchestrator = orchestrator(&dir, completion, Arc::clone(&source));

    let outcome = orchestrator
        .run_turn("s1", "completely different topic")
        .await
        .unwrap();

    assert!(!outcome.context_complete);
    assert_eq!(outcome.fetched_files, vec!["notes.txt".to_string()]);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn broken_rewriter_still_retrieves_with_the_raw_query() {
    let dir = tempfile::tempdir().unwrap();
    // Rewrite response is garbage and the script then runs dry, so the
    // decision step degrades to answering directly as well
    let completion = Arc::new(ScriptedCompletion::new(&["not json at all"]));
    let source = Arc::new(MockSource::new(&[]));
    let orchestrator = orchestrator(&dir, completion, Arc::clone(&source));

    let outcome = orchestrator.run_turn("s1", "anything").await.unwrap();
    assert_eq!(outcome.rewritten_query, "anything");
    assert!(outcome.chunks.is_empty());
    assert!(!outcome.context_complete);
}
