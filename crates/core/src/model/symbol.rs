use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
}

/// A named definition with its inclusive, 1-based line extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: usize,
    pub end_line: usize,
    /// Index of the lexically enclosing symbol in the same table.
    pub parent: Option<usize>,
}

impl Symbol {
    pub fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}
