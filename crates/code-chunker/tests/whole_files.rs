use repolens_code_chunker::{Chunker, ChunkKind};

fn reconstruct(chunks: &[repolens_code_chunker::Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn realistic_rust_file_covers_every_line() {
    let source = r#"use std::collections::HashMap;

/// Cache of parsed entries.
pub struct EntryCache {
    entries: HashMap<String, u64>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up an entry, returning zero when missing.
    pub fn get(&self, key: &str) -> u64 {
        self.entries.get(key).copied().unwrap_or(0)
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}"#;

    let chunker = Chunker::with_defaults();
    let chunks = chunker.chunk_file("cache.rs", source);

    assert_eq!(reconstruct(&chunks), source);

    // Chunks arrive in source order with no gaps or overlaps
    for pair in chunks.windows(2) {
        assert_eq!(pair[1].start_line, pair[0].end_line + 1);
    }

    let methods: Vec<_> = chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Method)
        .filter_map(|c| c.symbol_name.as_deref())
        .collect();
    assert_eq!(methods, vec!["new", "get"]);

    let functions: Vec<_> = chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Function)
        .filter_map(|c| c.symbol_name.as_deref())
        .collect();
    assert_eq!(functions, vec!["normalize"]);

    // Methods carry the impl header as searchable context
    assert!(chunks
        .iter()
        .filter(|c| c.kind == ChunkKind::Method)
        .all(|c| c.parent_context.as_deref().is_some_and(|p| p.contains("EntryCache"))));
}

#[test]
fn module_contents_fall_into_module_chunks() {
    let source = r#"mod api {
    pub struct Car;

    impl Car {
        pub fn drive(&self) {}
    }
}"#;

    let chunker = Chunker::with_defaults();
    let chunks = chunker.chunk_file("nested.rs", source);

    // Nested declarations are not pulled apart; the mod stays whole
    assert!(chunks.iter().all(|c| c.kind == ChunkKind::Module));
    assert_eq!(reconstruct(&chunks), source);
}

#[test]
fn python_file_with_docstrings_and_classes() {
    let source = r#"import json

DEFAULT_LIMIT = 100


class Paginator:
    """Splits result sets into pages."""

    def __init__(self, limit=DEFAULT_LIMIT):
        self.limit = limit

    def page(self, items, number):
        start = number * self.limit
        return items[start:start + self.limit]


def load_items(path):
    with open(path) as handle:
        return json.load(handle)"#;

    let chunker = Chunker::with_defaults();
    let chunks = chunker.chunk_file("paginate.py", source);

    assert_eq!(reconstruct(&chunks), source);

    assert!(chunks.iter().any(|c| c.kind == ChunkKind::ClassBody
        && c.symbol_name.as_deref() == Some("Paginator")));
    assert!(chunks.iter().any(|c| c.kind == ChunkKind::Method
        && c.symbol_name.as_deref() == Some("page")));
    assert!(chunks.iter().any(|c| c.kind == ChunkKind::Function
        && c.symbol_name.as_deref() == Some("load_items")));
}
