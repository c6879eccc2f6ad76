use super::import::ImportStatement;
use super::symbol::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Source,
    Test,
}

/// A catalogued project file, identified by its project-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Project-relative, `/`-separated.
    pub path: String,
    /// Dotted module name (`pkg/sub/mod.py` -> `pkg.sub.mod`, `pkg/__init__.py` -> `pkg`).
    pub module: String,
    /// True for package marker files.
    pub is_package: bool,
    pub role: FileRole,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, package_marker: &str, role: FileRole) -> Self {
        let path = path.into();
        let (module, is_package) = module_name(&path, package_marker);
        Self {
            path,
            module,
            is_package,
            role,
        }
    }

    pub fn is_test(&self) -> bool {
        self.role == FileRole::Test
    }

    /// Directory holding the file, relative to the project root ("" for the root).
    pub fn package_dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

fn module_name(path: &str, package_marker: &str) -> (String, bool) {
    let (dir, file_name) = match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    };
    if file_name == package_marker {
        return (dir.replace('/', "."), true);
    }
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    if dir.is_empty() {
        (stem.to_string(), false)
    } else {
        (format!("{}.{}", dir.replace('/', "."), stem), false)
    }
}

/// Parsed view of one file: ordered symbol table and ordered import list.
///
/// An unparsable file keeps both lists empty and sets `parse_failed`, which
/// forces whole-file treatment of any change to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedSource {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportStatement>,
    /// 1-based lines holding nothing but whitespace or comments.
    #[serde(default)]
    pub blank_lines: BTreeSet<usize>,
    pub parse_failed: bool,
}

impl ParsedSource {
    pub fn unparsable() -> Self {
        Self {
            parse_failed: true,
            ..Self::default()
        }
    }

    /// Innermost symbol whose extent contains `line` (1-based). Smallest range wins.
    pub fn innermost_symbol_at(&self, line: usize) -> Option<&Symbol> {
        self.innermost_index_at(line).map(|idx| &self.symbols[idx])
    }

    pub fn innermost_index_at(&self, line: usize) -> Option<usize> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.contains(line))
            .min_by_key(|(_, s)| (s.end_line - s.start_line, std::cmp::Reverse(s.start_line)))
            .map(|(idx, _)| idx)
    }

    /// True when `line` carries no code, so a change to it changes nothing.
    pub fn is_blank(&self, line: usize) -> bool {
        self.blank_lines.contains(&line)
    }

    /// The symbol at `idx` followed by its enclosing symbols, innermost first.
    /// Parents always precede their children in the table.
    pub fn enclosing_chain(&self, idx: usize) -> impl Iterator<Item = &Symbol> {
        let mut next = Some(idx);
        std::iter::from_fn(move || {
            let current = next?;
            let symbol = self.symbols.get(current)?;
            next = symbol.parent.filter(|&parent| parent < current);
            Some(symbol)
        })
    }
}
