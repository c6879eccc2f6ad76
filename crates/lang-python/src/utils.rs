use testscope_core::error::{Result, TestscopeError};
use tree_sitter::{Language, Node, Query};

/// Loads a Tree-sitter query from an SCM string.
pub fn load_query(language: &Language, scm: &str) -> Result<Query> {
    Query::new(language, scm)
        .map_err(|e| TestscopeError::Parsing(format!("Invalid query: {:?}", e)))
}

/// Gets the index of a capture name in a query.
pub fn get_capture_index(query: &Query, name: &str) -> Result<u32> {
    query
        .capture_index_for_name(name)
        .ok_or_else(|| TestscopeError::Parsing(format!("Capture name '{}' not found in SCM", name)))
}

/// Source text of a node with interior whitespace removed (`a . b` -> `a.b`).
pub fn compact_text(node: Node, source: &[u8]) -> String {
    node.utf8_text(source)
        .map(|text| text.split_whitespace().collect())
        .unwrap_or_default()
}

/// 1-based first and last line a node occupies.
///
/// A node whose end point sits at column 0 stops at the end of the previous
/// line.
pub fn line_span(node: Node) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let end_point = node.end_position();
    let mut end = end_point.row + 1;
    if end_point.column == 0 && end > start {
        end -= 1;
    }
    (start, end)
}

/// Macro to define a struct for capture indices and a `new` method to initialize it from a query.
macro_rules! decl_indices {
    ($name:ident, { $($field:ident => $capture:expr),+ $(,)? }) => {
        #[derive(Clone)]
        pub struct $name {
            $(pub $field: u32,)+
        }

        impl $name {
            pub fn new(query: &tree_sitter::Query) -> testscope_core::error::Result<Self> {
                Ok(Self {
                    $($field: $crate::utils::get_capture_index(query, $capture)?,)+
                })
            }
        }
    };
}

pub(crate) use decl_indices;
