use crate::config::ChunkerConfig;
use crate::language::Language;
use crate::types::{estimate_tokens, Chunk, ChunkKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines matching this start a new block in anchor-based chunking.
/// Covers declaration keywords across the brace and indent families.
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^\s*
        (?:pub(?:\([^)]*\))?\s+|export\s+|static\s+|final\s+|abstract\s+|
           public\s+|private\s+|protected\s+|async\s+)*
        (?:fn|func|function|def|class|struct|enum|interface|impl|trait|
           module|package|namespace|type|sub|void|int|bool|string)\b",
    )
    .expect("anchor regex is valid")
});

/// Regex-anchor chunker for languages without a bundled grammar, plus the
/// fixed-window fallback used when no anchors apply.
pub struct HeuristicChunker {
    config: ChunkerConfig,
}

impl HeuristicChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk a file without parsing it.
    ///
    /// Languages with declaration anchors are split at anchor lines into
    /// contiguous blocks, so concatenating the chunks reproduces the file.
    /// Anchor-free input falls back to overlapping fixed-size windows.
    pub fn chunk(&self, content: &str, file_path: &str, language: Language) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        if language.has_heuristic_anchors() {
            let chunks = self.chunk_by_anchors(content, file_path);
            if chunks.len() > 1 {
                return chunks;
            }
        }
        self.chunk_by_windows(content, file_path)
    }

    /// Split at declaration anchors, merging blocks below the minimum size
    /// into the next one
    fn chunk_by_anchors(&self, content: &str, file_path: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();

        let mut block_start = 1usize;
        let mut block_lines: Vec<&str> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let at_anchor = ANCHOR_RE.is_match(line);
            let block_text = block_lines.join("\n");
            let big_enough = estimate_tokens(&block_text) >= self.config.min_chunk_tokens;

            if at_anchor && !block_lines.is_empty() && big_enough {
                chunks.push(Chunk::new(
                    file_path,
                    block_start,
                    line_no - 1,
                    block_text,
                    ChunkKind::RawBlock,
                ));
                block_start = line_no;
                block_lines.clear();
            }
            block_lines.push(line);
        }

        // Tail block: whatever remains after the last anchor
        if !block_lines.is_empty() {
            chunks.push(Chunk::new(
                file_path,
                block_start,
                lines.len(),
                block_lines.join("\n"),
                ChunkKind::RawBlock,
            ));
        }

        chunks
    }

    /// Fixed token windows with configured overlap
    fn chunk_by_windows(&self, content: &str, file_path: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < lines.len() {
            let mut end = start;
            let mut tokens = 0usize;
            while end < lines.len() && tokens < self.config.window_tokens {
                tokens += estimate_tokens(lines[end]);
                end += 1;
            }

            let text = lines[start..end].join("\n");
            chunks.push(Chunk::new(
                file_path,
                start + 1,
                end,
                text,
                ChunkKind::RawBlock,
            ));

            if end >= lines.len() {
                break;
            }

            let window_len = end - start;
            let overlap =
                (window_len * usize::from(self.config.window_overlap_pct) / 100).max(1);
            // Always advance, no matter how small the window
            start = end.saturating_sub(overlap).max(start + 1);
        }

        chunks
    }
}
