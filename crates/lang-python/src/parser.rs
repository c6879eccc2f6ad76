use crate::queries::{PYTHON_DEFINITIONS_SCM, PythonIndices};
use crate::utils::{compact_text, line_span, load_query};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use testscope_core::error::{Result, TestscopeError};
use testscope_core::model::{ImportStatement, ParsedSource, Symbol, SymbolKind};
use testscope_core::parser::SourceParser;
use tracing::debug;
use tree_sitter::{Node, Parser, Query, QueryCursor, QueryMatch, StreamingIterator, Tree};

/// A definition found by the query, before parents are linked.
struct RawSymbol<'tree> {
    name: String,
    kind: SymbolKind,
    node: Node<'tree>,
}

pub struct PythonParser {
    language: tree_sitter::Language,
    query: Arc<Query>,
    indices: PythonIndices,
}

impl Clone for PythonParser {
    fn clone(&self) -> Self {
        Self {
            language: self.language.clone(),
            query: Arc::clone(&self.query),
            indices: self.indices.clone(),
        }
    }
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let query = load_query(&language, PYTHON_DEFINITIONS_SCM)?;
        let indices = PythonIndices::new(&query)?;
        Ok(Self {
            language,
            query: Arc::new(query),
            indices,
        })
    }

    pub fn parse_tree(&self, source: &str) -> Result<Tree> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| TestscopeError::Parsing(format!("Failed to load Python grammar: {}", e)))?;
        parser
            .parse(source, None)
            .ok_or_else(|| TestscopeError::Parsing("Parser produced no tree".to_string()))
    }

    /// Symbol table and import list of an error-free tree.
    pub fn extract(&self, tree: &Tree, source: &str) -> ParsedSource {
        let bytes = source.as_bytes();
        let mut raw: Vec<RawSymbol> = Vec::new();
        let mut imports: Vec<ImportStatement> = Vec::new();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, tree.root_node(), bytes);
        while let Some(mat) = matches.next() {
            if let Some(def) = capture(mat, self.indices.function_def) {
                if let Some(name) = capture(mat, self.indices.function_name) {
                    raw.push(RawSymbol {
                        name: compact_text(name, bytes),
                        kind: SymbolKind::Function,
                        node: def,
                    });
                }
            } else if let Some(def) = capture(mat, self.indices.class_def) {
                if let Some(name) = capture(mat, self.indices.class_name) {
                    raw.push(RawSymbol {
                        name: compact_text(name, bytes),
                        kind: SymbolKind::Class,
                        node: def,
                    });
                }
            } else if let Some(node) = capture(mat, self.indices.import) {
                import_statement(node, bytes, &mut imports);
            } else if let Some(node) = capture(mat, self.indices.import_from) {
                import_from_statement(node, bytes, &mut imports);
            }
        }

        imports.sort_by_key(|i| i.line);

        ParsedSource {
            symbols: link_symbols(raw),
            imports,
            blank_lines: blank_lines(tree.root_node(), source),
            parse_failed: false,
        }
    }
}

/// Lines no token other than a comment touches. Strings count as a whole, so
/// blank lines inside a multi-line literal stay code.
fn blank_lines(root: Node, source: &str) -> BTreeSet<usize> {
    let total = source.lines().count();
    let mut code = vec![false; total + 1];

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            continue;
        }
        if node.child_count() == 0 || node.kind() == "string" {
            let (start, end) = line_span(node);
            for line in start..=end.min(total) {
                code[line] = true;
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    (1..=total).filter(|&line| !code[line]).collect()
}

impl SourceParser for PythonParser {
    fn name(&self) -> &str {
        "python"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn parse_source(&self, source: &str, file_path: Option<&Path>) -> Result<ParsedSource> {
        let tree = self.parse_tree(source)?;
        if tree.root_node().has_error() {
            debug!(
                "Syntax errors in {}",
                file_path.map(|p| p.display().to_string()).unwrap_or_default()
            );
            return Ok(ParsedSource::unparsable());
        }
        Ok(self.extract(&tree, source))
    }
}

fn capture<'tree>(mat: &QueryMatch<'_, 'tree>, index: u32) -> Option<Node<'tree>> {
    mat.captures
        .iter()
        .find(|c| c.index == index)
        .map(|c| c.node)
}

/// Orders symbols by position and links each to its nearest enclosing
/// definition through the syntax tree.
fn link_symbols(mut raw: Vec<RawSymbol>) -> Vec<Symbol> {
    raw.sort_by_key(|r| r.node.start_byte());

    let by_node: HashMap<usize, usize> = raw
        .iter()
        .enumerate()
        .map(|(i, r)| (r.node.id(), i))
        .collect();

    raw.iter()
        .map(|r| {
            let mut parent = None;
            let mut current = r.node;
            while let Some(up) = current.parent() {
                if let Some(&idx) = by_node.get(&up.id()) {
                    parent = Some(idx);
                    break;
                }
                current = up;
            }
            let (start_line, end_line) = line_span(r.node);
            Symbol {
                name: r.name.clone(),
                kind: r.kind,
                start_line,
                end_line,
                parent,
            }
        })
        .collect()
}

/// Name bound by a `dotted_name` or the original name of an `aliased_import`.
fn imported_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "dotted_name" => Some(compact_text(node, source)),
        "aliased_import" => node
            .child_by_field_name("name")
            .map(|n| compact_text(n, source)),
        _ => None,
    }
}

/// `import a.b, c as d`
fn import_statement(node: Node, source: &[u8], out: &mut Vec<ImportStatement>) {
    let line = node.start_position().row + 1;
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        if let Some(module) = imported_name(child, source) {
            out.push(ImportStatement::module(module, line));
        }
    }
}

/// `from <dots><module> import <names | *>`
fn import_from_statement(node: Node, source: &[u8], out: &mut Vec<ImportStatement>) {
    let line = node.start_position().row + 1;
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return;
    };

    let (module, level) = if module_node.kind() == "relative_import" {
        let mut level = 0;
        let mut module = String::new();
        let mut cursor = module_node.walk();
        for child in module_node.children(&mut cursor) {
            match child.kind() {
                "import_prefix" => {
                    level = compact_text(child, source).matches('.').count();
                }
                "dotted_name" => module = compact_text(child, source),
                _ => {}
            }
        }
        (module, level)
    } else {
        (compact_text(module_node, source), 0)
    };

    if level == 0 && module == "__future__" {
        return;
    }

    let mut cursor = node.walk();
    let wildcard = node
        .children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import");
    if wildcard {
        out.push(ImportStatement::from_import(module, level, None, line));
        return;
    }

    let mut names = BTreeSet::new();
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        if let Some(name) = imported_name(child, source) {
            names.insert(name);
        }
    }
    out.push(ImportStatement::from_import(module, level, Some(names), line));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedSource {
        PythonParser::new()
            .unwrap()
            .parse_source(source, None)
            .unwrap()
    }

    fn names(items: &[&str]) -> Option<BTreeSet<String>> {
        Some(items.iter().map(|s| s.to_string()).collect())
    }

    const DEFINITIONS: &str = "\
import os

@decorator
def top(a):
    return a


class User:
    def __init__(self, name):
        self.name = name

    @property
    def display(self):
        return self.name.title()


async def fetch():
    pass
";

    #[test]
    fn test_symbols_in_source_order() {
        let parsed = parse(DEFINITIONS);
        assert!(!parsed.parse_failed);
        let found: Vec<(&str, SymbolKind, usize)> = parsed
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind, s.start_line))
            .collect();
        assert_eq!(
            found,
            vec![
                ("top", SymbolKind::Function, 4),
                ("User", SymbolKind::Class, 8),
                ("__init__", SymbolKind::Function, 9),
                ("display", SymbolKind::Function, 13),
                ("fetch", SymbolKind::Function, 17),
            ]
        );
    }

    #[test]
    fn test_extents_and_nesting() {
        let parsed = parse(DEFINITIONS);
        let user = &parsed.symbols[1];
        assert!(user.contains(14));
        assert!(!user.contains(17));
        assert_eq!(parsed.symbols[2].parent, Some(1));
        assert_eq!(parsed.symbols[3].parent, Some(1));
        assert_eq!(parsed.symbols[0].parent, None);

        assert_eq!(parsed.innermost_symbol_at(10).map(|s| s.name.as_str()), Some("__init__"));
        assert_eq!(parsed.innermost_symbol_at(11).map(|s| s.name.as_str()), Some("User"));
        assert_eq!(parsed.innermost_symbol_at(5).map(|s| s.name.as_str()), Some("top"));
        // Decorator lines belong to no symbol.
        assert!(parsed.innermost_symbol_at(3).is_none());
        assert!(parsed.innermost_symbol_at(1).is_none());
    }

    #[test]
    fn test_import_forms() {
        let parsed = parse(
            "\
from __future__ import annotations
import os.path
import pkg.sub as alias
from . import sibling
from ..core.models import User as U, Admin
from .validators import *
from x import (a,
    b)

def f():
    import json
",
        );
        assert_eq!(
            parsed.imports,
            vec![
                ImportStatement::module("os.path", 2),
                ImportStatement::module("pkg.sub", 3),
                ImportStatement::from_import("", 1, names(&["sibling"]), 4),
                ImportStatement::from_import("core.models", 2, names(&["Admin", "User"]), 5),
                ImportStatement::from_import("validators", 1, None, 6),
                ImportStatement::from_import("x", 0, names(&["a", "b"]), 7),
                ImportStatement::module("json", 11),
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let parsed = parse(
            "\
import os

# module comment
X = \"\"\"

\"\"\"

def f():
    # inside
    return X
",
        );
        assert_eq!(parsed.blank_lines, BTreeSet::from([2, 3, 7, 9]));

        let decorated = parse(DEFINITIONS);
        assert!(decorated.is_blank(2));
        assert!(!decorated.is_blank(3));
    }

    #[test]
    fn test_syntax_error_marks_file_unparsable() {
        let parsed = parse("def broken(:\n    pass\n");
        assert!(parsed.parse_failed);
        assert!(parsed.symbols.is_empty());
        assert!(parsed.imports.is_empty());
    }

    #[test]
    fn test_empty_file() {
        let parsed = parse("");
        assert!(!parsed.parse_failed);
        assert!(parsed.symbols.is_empty());
    }
}
