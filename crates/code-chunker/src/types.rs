use serde::{Deserialize, Serialize};

/// Stable identifier for a chunk, derived from its source location.
///
/// Re-chunking an unchanged file reproduces identical ids, which is what
/// makes index upserts idempotent downstream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Derive an id from a source location
    #[must_use]
    pub fn from_location(file_path: &str, start_line: usize, end_line: usize) -> Self {
        Self(format!("{file_path}:{start_line}:{end_line}"))
    }

    /// Wrap an already-formatted id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical category of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Top-level unit that is not a function or class (struct, enum, const, module body)
    Module,
    /// Non-method class-level code (fields, class constants, class header)
    ClassBody,
    /// Free function
    Function,
    /// Function defined inside a class or impl block
    Method,
    /// Fixed-window fallback fragment with no guaranteed syntactic boundary
    RawBlock,
}

impl ChunkKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::ClassBody => "class_body",
            Self::Function => "function",
            Self::Method => "method",
            Self::RawBlock => "raw_block",
        }
    }

    /// Whether chunks of this kind carry a complete syntactic unit
    #[must_use]
    pub const fn is_syntactic(self) -> bool {
        !matches!(self, Self::RawBlock)
    }
}

/// A code fragment with preserved logical boundaries.
///
/// Chunks are immutable once produced: re-ingestion replaces them wholesale
/// rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable id, `{file_path}:{start_line}:{end_line}`
    pub id: ChunkId,

    /// Source file path
    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// The chunk text
    pub text: String,

    /// Logical category
    pub kind: ChunkKind,

    /// Symbol name when the chunk maps to one declaration
    pub symbol_name: Option<String>,

    /// Synthesized enclosing-class header for methods (bounded length)
    pub parent_context: Option<String>,

    /// Estimated token count
    pub token_count: usize,
}

impl Chunk {
    /// Create a chunk, deriving its id and token count
    #[must_use]
    pub fn new(
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        text: impl Into<String>,
        kind: ChunkKind,
    ) -> Self {
        let file_path = file_path.into();
        let text = text.into();
        let token_count = estimate_tokens(&text);
        Self {
            id: ChunkId::from_location(&file_path, start_line, end_line),
            file_path,
            start_line,
            end_line,
            text,
            kind,
            symbol_name: None,
            parent_context: None,
            token_count,
        }
    }

    /// Builder: set symbol name
    #[must_use]
    pub fn with_symbol(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    /// Builder: set parent context header
    #[must_use]
    pub fn with_parent_context(mut self, header: impl Into<String>) -> Self {
        self.parent_context = Some(header.into());
        self
    }

    /// Extend this chunk downward to cover trailing lines, keeping the id
    /// and token estimate in sync
    pub fn absorb_lines(&mut self, new_end_line: usize, extra_text: &str) {
        self.text.push('\n');
        self.text.push_str(extra_text);
        self.end_line = new_end_line;
        self.id = ChunkId::from_location(&self.file_path, self.start_line, self.end_line);
        self.token_count = estimate_tokens(&self.text);
    }

    /// Number of lines spanned
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Text as seen by the indices: parent context header (if any) + body.
    ///
    /// The header keeps class-level intent attached to isolated method chunks
    /// without changing the reconstructable `text`.
    #[must_use]
    pub fn indexable_text(&self) -> String {
        match &self.parent_context {
            Some(header) => format!("{header}\n{}", self.text),
            None => self.text.clone(),
        }
    }
}

/// Rough token estimate: ~4 chars per token for code
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}
