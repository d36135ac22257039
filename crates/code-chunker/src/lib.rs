//! # Repolens Code Chunker
//!
//! AST-aware code chunking for hybrid retrieval.
//!
//! ## Philosophy
//!
//! Chunks are the unit of both indexing and reconstruction, so the chunker
//! guarantees two things at once:
//! - Every chunk is either a syntactically complete declaration or an
//!   explicitly raw block
//! - Chunks for a file are contiguous and ordered, so concatenating their
//!   texts reproduces the source
//!
//! ## Architecture
//!
//! ```text
//! Source File
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> AST path (tree-sitter grammar available)
//!     │    ├─> Functions → Function chunks
//!     │    ├─> Class/impl methods → Method chunks + parent header
//!     │    └─> Remaining lines → ClassBody / Module chunks
//!     │
//!     ├──> Heuristic path (no grammar, or parse failed)
//!     │    └─> Declaration-anchor blocks → RawBlock chunks
//!     │
//!     ├──> Window path (no anchors either)
//!     │    └─> Overlapping fixed-size windows → RawBlock chunks
//!     │
//!     └──> Budget enforcement
//!          └─> Oversize chunks split into contiguous raw blocks
//! ```
//!
//! ## Example
//!
//! ```rust
//! use repolens_code_chunker::Chunker;
//!
//! let chunker = Chunker::with_defaults();
//!
//! let code = r#"
//! fn process_data(input: &str) -> String {
//!     input.trim().to_uppercase()
//! }
//! "#;
//!
//! for chunk in chunker.chunk_file("example.rs", code) {
//!     println!(
//!         "lines {}-{}: {:?} {}",
//!         chunk.start_line,
//!         chunk.end_line,
//!         chunk.kind,
//!         chunk.symbol_name.unwrap_or_default()
//!     );
//! }
//! ```

mod ast;
mod chunker;
mod config;
mod error;
mod heuristic;
mod language;
mod split;
mod types;

pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use types::{estimate_tokens, Chunk, ChunkId, ChunkKind};

pub use language::Language;
