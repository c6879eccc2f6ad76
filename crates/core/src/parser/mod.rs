use crate::error::Result;
use crate::model::ParsedSource;
use std::path::Path;

/// Language front-end for the syntax indexer.
///
/// Implementations turn one file's text into its symbol table and import list.
/// An `Err` marks the file unparsable; the engine records it with empty tables
/// and keeps going.
pub trait SourceParser: Send + Sync {
    fn name(&self) -> &str;

    fn supported_extensions(&self) -> &[&str];

    fn parse_source(&self, source: &str, file_path: Option<&Path>) -> Result<ParsedSource>;
}
