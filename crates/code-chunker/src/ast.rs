use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{Chunk, ChunkKind};
use tree_sitter::{Node, Parser};

/// A claimed line range, produced while walking the tree and later
/// assembled into gap-free chunks.
#[derive(Debug)]
struct Claim {
    /// 1-based, inclusive
    start_line: usize,
    /// 1-based, inclusive
    end_line: usize,
    kind: ChunkKind,
    symbol: Option<String>,
    parent_context: Option<String>,
}

/// AST-based chunker for languages with a tree-sitter grammar.
///
/// Functions become [`ChunkKind::Function`] chunks, class/impl methods become
/// [`ChunkKind::Method`] chunks carrying a synthesized parent header, the rest
/// of a class body becomes [`ChunkKind::ClassBody`], and any source lines not
/// claimed by a declaration are swept into [`ChunkKind::Module`] chunks. Line
/// ranges never overlap and cover the whole file, so concatenating chunk texts
/// in order reproduces the source.
pub struct AstChunker {
    config: ChunkerConfig,
    parser: Parser,
    language: Language,
}

impl AstChunker {
    /// Create a new AST chunker for a language
    pub fn new(config: ChunkerConfig, language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self {
            config,
            parser,
            language,
        })
    }

    /// Parse and chunk source code.
    ///
    /// Returns [`ChunkerError::ParseFailure`] when the grammar reports syntax
    /// errors, so callers can downgrade to heuristic chunking.
    pub fn chunk(&mut self, content: &str, file_path: &str) -> Result<Vec<Chunk>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse("parser produced no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ChunkerError::parse(format!(
                "syntax errors in {file_path}"
            )));
        }

        let lines: Vec<&str> = content.lines().collect();
        let mut claims = Vec::new();
        self.collect_claims(content, &lines, root, &mut claims);

        Ok(self.assemble(file_path, &lines, claims))
    }

    /// Walk top-level declarations and record line claims
    fn collect_claims(
        &self,
        content: &str,
        lines: &[&str],
        root: Node,
        claims: &mut Vec<Claim>,
    ) {
        let mut cursor = root.walk();
        let children: Vec<_> = root.children(&mut cursor).collect();

        for child in children {
            let node = Self::unwrap_declaration(child);
            match self.language {
                Language::Rust => match node.kind() {
                    "function_item" => {
                        claims.push(self.function_claim(
                            content,
                            lines,
                            node,
                            node,
                            ChunkKind::Function,
                        ));
                    }
                    "impl_item" => {
                        self.collect_rust_impl(content, lines, node, claims);
                    }
                    _ => {}
                },
                Language::Python => match node.kind() {
                    "function_definition" => {
                        claims.push(self.function_claim(
                            content,
                            lines,
                            child,
                            node,
                            ChunkKind::Function,
                        ));
                    }
                    "class_definition" => {
                        self.collect_class(content, lines, child, node, "block", claims);
                    }
                    _ => {}
                },
                Language::JavaScript | Language::TypeScript => match node.kind() {
                    "function_declaration" => {
                        claims.push(self.function_claim(
                            content,
                            lines,
                            child,
                            node,
                            ChunkKind::Function,
                        ));
                    }
                    "class_declaration" => {
                        self.collect_class(content, lines, child, node, "class_body", claims);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// Look through wrapper nodes (decorators, export statements) to the
    /// declaration they carry
    fn unwrap_declaration(node: Node) -> Node {
        if matches!(node.kind(), "decorated_definition" | "export_statement") {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(
                    child.kind(),
                    "function_item"
                        | "function_definition"
                        | "function_declaration"
                        | "class_definition"
                        | "class_declaration"
                        | "impl_item"
                ) {
                    return child;
                }
            }
        }
        node
    }

    /// Claim a top-level function, extending upward over contiguous leading
    /// comments so docs travel with the code they document.
    ///
    /// `span_node` may be a decorator/export wrapper; `name_node` is the
    /// declaration itself.
    fn function_claim(
        &self,
        content: &str,
        lines: &[&str],
        span_node: Node,
        name_node: Node,
        kind: ChunkKind,
    ) -> Claim {
        let start_line = self.extend_over_comments(lines, span_node.start_position().row + 1, 1);
        Claim {
            start_line,
            end_line: span_node.end_position().row + 1,
            kind,
            symbol: Self::extract_symbol_name(content, name_node),
            parent_context: None,
        }
    }

    /// Decompose a Rust impl block into Method claims plus ClassBody claims
    /// for the surrounding lines
    fn collect_rust_impl(
        &self,
        content: &str,
        lines: &[&str],
        impl_node: Node,
        claims: &mut Vec<Claim>,
    ) {
        let target = Self::extract_impl_target(content, impl_node);
        let header = self.synthesize_parent_context(lines, impl_node.start_position().row + 1);

        let mut methods = Vec::new();
        let mut cursor = impl_node.walk();
        for child in impl_node.children(&mut cursor) {
            if child.kind() == "declaration_list" {
                let mut decl_cursor = child.walk();
                for member in child.children(&mut decl_cursor) {
                    if member.kind() == "function_item" {
                        methods.push(member);
                    }
                }
            }
        }

        self.push_class_claims(
            content,
            lines,
            impl_node.start_position().row + 1,
            impl_node.end_position().row + 1,
            &methods,
            target.as_deref(),
            &header,
            claims,
        );
    }

    /// Decompose a Python/JS/TS class into Method and ClassBody claims
    fn collect_class(
        &self,
        content: &str,
        lines: &[&str],
        outer: Node,
        class_node: Node,
        body_kind: &str,
        claims: &mut Vec<Claim>,
    ) {
        let class_name = Self::extract_symbol_name(content, class_node);
        let header = self.synthesize_parent_context(lines, class_node.start_position().row + 1);

        let mut methods = Vec::new();
        let mut cursor = class_node.walk();
        for child in class_node.children(&mut cursor) {
            if child.kind() == body_kind {
                let mut body_cursor = child.walk();
                for member in child.children(&mut body_cursor) {
                    let resolved = Self::unwrap_declaration(member);
                    if matches!(resolved.kind(), "function_definition" | "method_definition") {
                        methods.push(member);
                    }
                }
            }
        }

        self.push_class_claims(
            content,
            lines,
            outer.start_position().row + 1,
            outer.end_position().row + 1,
            &methods,
            class_name.as_deref(),
            &header,
            claims,
        );
    }

    /// Interleave Method claims with ClassBody claims covering the rest of
    /// the class span
    #[allow(clippy::too_many_arguments)]
    fn push_class_claims(
        &self,
        content: &str,
        lines: &[&str],
        class_start: usize,
        class_end: usize,
        methods: &[Node],
        parent_name: Option<&str>,
        header: &str,
        claims: &mut Vec<Claim>,
    ) {
        let mut cursor_line = class_start;

        for method in methods {
            let raw_start = method.start_position().row + 1;
            let start = self
                .extend_over_comments(lines, raw_start, cursor_line)
                .max(cursor_line);
            let end = method.end_position().row + 1;

            if start > cursor_line {
                claims.push(Claim {
                    start_line: cursor_line,
                    end_line: start - 1,
                    kind: ChunkKind::ClassBody,
                    symbol: parent_name.map(str::to_string),
                    parent_context: None,
                });
            }

            let symbol = Self::extract_symbol_name(content, Self::unwrap_declaration(*method));
            claims.push(Claim {
                start_line: start,
                end_line: end,
                kind: ChunkKind::Method,
                symbol,
                parent_context: Some(header.to_string()),
            });
            cursor_line = end + 1;
        }

        if cursor_line <= class_end {
            claims.push(Claim {
                start_line: cursor_line,
                end_line: class_end,
                kind: ChunkKind::ClassBody,
                symbol: parent_name.map(str::to_string),
                parent_context: None,
            });
        }
    }

    /// Build the abbreviated class/impl header attached to method chunks
    fn synthesize_parent_context(&self, lines: &[&str], class_start: usize) -> String {
        let mut header = lines
            .get(class_start - 1)
            .map(|l| l.trim_end().to_string())
            .unwrap_or_default();
        header.push_str("\n    ...");

        if header.len() > self.config.max_parent_context_chars {
            let mut cut = self.config.max_parent_context_chars;
            while !header.is_char_boundary(cut) {
                cut -= 1;
            }
            header.truncate(cut);
        }
        header
    }

    /// Walk upward from `start_line` over a contiguous run of comment lines,
    /// not crossing `floor`
    fn extend_over_comments(&self, lines: &[&str], start_line: usize, floor: usize) -> usize {
        let mut line = start_line;
        while line > floor {
            let above = lines[line - 2].trim();
            if self.is_comment_line(above) {
                line -= 1;
            } else {
                break;
            }
        }
        line
    }

    fn is_comment_line(&self, line: &str) -> bool {
        match self.language {
            Language::Rust => {
                line.starts_with("///")
                    || line.starts_with("//!")
                    || line.starts_with("//")
                    || line.starts_with("/*")
                    || line.starts_with('*')
                    || line.starts_with("#[")
            }
            Language::Python => line.starts_with('#') || line.starts_with('@'),
            Language::JavaScript | Language::TypeScript => {
                line.starts_with("//")
                    || line.starts_with("/*")
                    || line.starts_with('*')
                    || line.starts_with('@')
            }
            _ => false,
        }
    }

    /// Extract the target type name of an impl block
    fn extract_impl_target(content: &str, impl_node: Node) -> Option<String> {
        let mut cursor = impl_node.walk();
        for child in impl_node.children(&mut cursor) {
            match child.kind() {
                "type_identifier" => {
                    return Some(content[child.start_byte()..child.end_byte()].to_string());
                }
                "generic_type" | "scoped_type_identifier" => {
                    let mut type_cursor = child.walk();
                    for type_child in child.children(&mut type_cursor) {
                        if type_child.kind() == "type_identifier" {
                            return Some(
                                content[type_child.start_byte()..type_child.end_byte()]
                                    .to_string(),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Extract symbol name from an AST node
    fn extract_symbol_name(content: &str, node: Node) -> Option<String> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let is_name_node = matches!(
                child.kind(),
                "identifier" | "name" | "type_identifier" | "field_identifier" | "property_identifier"
            );
            if is_name_node {
                return Some(content[child.start_byte()..child.end_byte()].to_string());
            }
        }
        None
    }

    /// Turn sorted claims into chunks, filling unclaimed line ranges with
    /// Module chunks so the file is covered end to end
    fn assemble(&self, file_path: &str, lines: &[&str], mut claims: Vec<Claim>) -> Vec<Chunk> {
        claims.sort_by_key(|c| c.start_line);

        let total = lines.len();
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut cursor = 1usize;

        for mut claim in claims {
            if claim.start_line < cursor {
                claim.start_line = cursor;
            }
            if claim.end_line < claim.start_line || claim.start_line > total {
                continue;
            }
            claim.end_line = claim.end_line.min(total);

            if claim.start_line > cursor {
                self.push_gap(file_path, lines, cursor, claim.start_line - 1, &mut chunks);
            }

            let text = lines[claim.start_line - 1..claim.end_line].join("\n");
            let mut chunk = Chunk::new(
                file_path,
                claim.start_line,
                claim.end_line,
                text,
                claim.kind,
            );
            if let Some(symbol) = claim.symbol {
                chunk = chunk.with_symbol(symbol);
            }
            if let Some(ctx) = claim.parent_context {
                chunk = chunk.with_parent_context(ctx);
            }
            chunks.push(chunk);
            cursor = claim.end_line + 1;
        }

        if cursor <= total {
            self.push_gap(file_path, lines, cursor, total, &mut chunks);
        }

        chunks
    }

    /// Emit unclaimed lines as a Module chunk, or fold whitespace-only gaps
    /// into the previous chunk
    fn push_gap(
        &self,
        file_path: &str,
        lines: &[&str],
        start: usize,
        end: usize,
        chunks: &mut Vec<Chunk>,
    ) {
        let text = lines[start - 1..end].join("\n");
        if text.trim().is_empty() {
            if let Some(prev) = chunks.last_mut() {
                prev.absorb_lines(end, &text);
                return;
            }
        }
        chunks.push(Chunk::new(file_path, start, end, text, ChunkKind::Module));
    }
}
