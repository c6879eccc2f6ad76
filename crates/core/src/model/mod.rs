pub mod edge;
pub mod import;
pub mod source;
pub mod symbol;

pub use edge::{ResolvedEdge, SymbolSet};
pub use import::{ImportKind, ImportStatement};
pub use source::{FileRole, ParsedSource, SourceFile};
pub use symbol::{Symbol, SymbolKind};
