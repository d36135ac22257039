use crate::ast::AstChunker;
use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::heuristic::HeuristicChunker;
use crate::language::Language;
use crate::split::enforce_budget;
use crate::types::Chunk;

/// Capability-based chunker: picks the richest strategy the file supports
/// and degrades gracefully instead of failing.
///
/// Dispatch order:
/// 1. AST chunking when the language has a bundled grammar
/// 2. Regex-anchor chunking when AST is unavailable or the parse fails
/// 3. Fixed overlapping windows for anchor-free input
///
/// Every produced chunk respects the configured token budget; oversize
/// chunks are split into contiguous raw blocks.
pub struct Chunker {
    config: ChunkerConfig,
    heuristic: HeuristicChunker,
}

impl Chunker {
    /// Create a chunker with validated configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let heuristic = HeuristicChunker::new(config.clone());
        Ok(Self { config, heuristic })
    }

    /// Create a chunker with default configuration
    pub fn with_defaults() -> Self {
        let config = ChunkerConfig::default();
        let heuristic = HeuristicChunker::new(config.clone());
        Self { config, heuristic }
    }

    /// Chunk a file, inferring the language from its path.
    ///
    /// Never fails: parse errors downgrade to the heuristic path with a
    /// warning. Empty input yields an empty list.
    pub fn chunk_file(&self, file_path: &str, content: &str) -> Vec<Chunk> {
        self.chunk_with_language(file_path, content, Language::from_path(file_path))
    }

    /// Chunk a file with an explicit language
    pub fn chunk_with_language(
        &self,
        file_path: &str,
        content: &str,
        language: Language,
    ) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let chunks = if language.supports_ast() {
            match self.try_ast(file_path, content, language) {
                Ok(chunks) => chunks,
                Err(e) => {
                    log::warn!("AST chunking failed for {file_path}, using heuristics: {e}");
                    self.heuristic.chunk(content, file_path, language)
                }
            }
        } else {
            self.heuristic.chunk(content, file_path, language)
        };

        enforce_budget(chunks, &self.config)
    }

    fn try_ast(&self, file_path: &str, content: &str, language: Language) -> Result<Vec<Chunk>> {
        let mut ast = AstChunker::new(self.config.clone(), language)?;
        ast.chunk(content, file_path)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}
