use crate::config::ChunkerConfig;
use crate::types::{estimate_tokens, Chunk, ChunkKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Break-point candidates inside an oversize chunk: nested declarations
/// (indented `fn`/`def`/`function` lines) rank above plain blank lines.
static NESTED_DECL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(?:async\s+)?(?:pub\s+)?(?:fn|def|function)\b").expect("nested decl regex is valid"));

/// Split a chunk that exceeds the token budget into contiguous parts.
///
/// Parts keep the source order and cover the chunk's full line range, so
/// concatenating their texts reproduces the original chunk. Every part is
/// demoted to [`ChunkKind::RawBlock`] since it is no longer a complete
/// declaration. Lines are the atomic unit: a single line longer than the
/// budget is passed through as one part.
pub fn split_oversize(chunk: Chunk, config: &ChunkerConfig) -> Vec<Chunk> {
    if chunk.token_count <= config.max_chunk_tokens {
        return vec![chunk];
    }

    let lines: Vec<&str> = chunk.text.lines().collect();
    let mut parts = Vec::new();

    let mut part_start = 0usize;
    let mut part_tokens = 0usize;
    let mut last_decl_break: Option<usize> = None;
    let mut last_blank_break: Option<usize> = None;

    let mut idx = 0usize;
    while idx < lines.len() {
        let line = lines[idx];
        let line_tokens = estimate_tokens(line);

        if part_tokens > 0 && part_tokens + line_tokens > config.max_chunk_tokens {
            // Prefer breaking before a nested declaration, then at a blank
            // line, then hard-cut right here
            let break_at = last_decl_break
                .or(last_blank_break)
                .filter(|&b| b > part_start)
                .unwrap_or(idx);

            parts.push(make_part(&chunk, &lines, part_start, break_at));
            part_start = break_at;
            part_tokens = lines[part_start..idx]
                .iter()
                .map(|l| estimate_tokens(l))
                .sum();
            last_decl_break = None;
            last_blank_break = None;
        }

        if idx > part_start {
            if NESTED_DECL_RE.is_match(line) {
                last_decl_break = Some(idx);
            } else if line.trim().is_empty() {
                last_blank_break = Some(idx + 1);
            }
        }

        part_tokens += line_tokens;
        idx += 1;
    }

    if part_start < lines.len() {
        parts.push(make_part(&chunk, &lines, part_start, lines.len()));
    }

    parts
}

/// Apply [`split_oversize`] across a whole chunk list, preserving order
pub fn enforce_budget(chunks: Vec<Chunk>, config: &ChunkerConfig) -> Vec<Chunk> {
    chunks
        .into_iter()
        .flat_map(|c| split_oversize(c, config))
        .collect()
}

fn make_part(source: &Chunk, lines: &[&str], start: usize, end: usize) -> Chunk {
    let text = lines[start..end].join("\n");
    let mut part = Chunk::new(
        &source.file_path,
        source.start_line + start,
        source.start_line + end - 1,
        text,
        ChunkKind::RawBlock,
    );
    if let Some(ctx) = &source.parent_context {
        part = part.with_parent_context(ctx.clone());
    }
    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tight_config(max_chunk_tokens: usize) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_tokens,
            min_chunk_tokens: 1,
            window_tokens: max_chunk_tokens,
            ..Default::default()
        }
    }

    #[test]
    fn small_chunks_pass_through() {
        let chunk = Chunk::new("a.rs", 1, 2, "fn a() {}\nfn b() {}", ChunkKind::Module);
        let parts = split_oversize(chunk.clone(), &ChunkerConfig::default());
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].kind, ChunkKind::Module);
        assert_eq!(parts[0].text, chunk.text);
    }

    #[test]
    fn oversize_chunk_splits_at_blank_lines_and_reconstructs() {
        let paragraph = "let value = compute_something_expensive(input, options);";
        let text = format!(
            "{}\n{}\n\n{}\n{}",
            paragraph, paragraph, paragraph, paragraph
        );
        let chunk = Chunk::new("big.rs", 10, 14, text.clone(), ChunkKind::Function);

        let parts = split_oversize(chunk, &tight_config(30));
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| p.kind == ChunkKind::RawBlock));

        // contiguous line coverage
        assert_eq!(parts[0].start_line, 10);
        assert_eq!(parts.last().unwrap().end_line, 14);
        for pair in parts.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }

        let rebuilt = parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn nested_declarations_are_preferred_break_points() {
        let text = "\
def outer():
    x = prepare_everything_for_the_inner_call(argument)
    y = prepare_more_state_for_the_inner_call(argument)
    def inner():
        return finish_the_computation_with(x, y)
    return inner";
        let chunk = Chunk::new("n.py", 1, 6, text, ChunkKind::Function);

        let parts = split_oversize(chunk, &tight_config(30));
        assert!(parts.len() > 1);
        assert!(parts
            .iter()
            .any(|p| p.text.trim_start().starts_with("def inner():")));
    }

    #[test]
    fn parent_context_survives_the_split() {
        let line = "self.counter = self.counter + self.step_size_value";
        let text = vec![line; 8].join("\n");
        let chunk = Chunk::new("m.py", 5, 12, text, ChunkKind::Method)
            .with_parent_context("class Counter:");

        let parts = split_oversize(chunk, &tight_config(40));
        assert!(parts.len() > 1);
        assert!(parts
            .iter()
            .all(|p| p.parent_context.as_deref() == Some("class Counter:")));
    }
}
