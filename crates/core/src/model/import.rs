use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `from a.b import x` / `from a import *`
    Absolute,
    /// `from . import x` / `from ..pkg import y`
    Relative,
    /// `import a.b`
    WildcardModule,
}

/// One import statement, normalized. A multi-target `import a, b` yields one
/// statement per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub kind: ImportKind,
    /// Dotted module path; empty for `from . import x`.
    pub module: String,
    /// `None` means the whole module surface.
    pub names: Option<BTreeSet<String>>,
    /// Number of leading dots; 0 for absolute forms.
    pub level: usize,
    pub line: usize,
}

impl ImportStatement {
    pub fn module(module: impl Into<String>, line: usize) -> Self {
        Self {
            kind: ImportKind::WildcardModule,
            module: module.into(),
            names: None,
            level: 0,
            line,
        }
    }

    /// `from <dots><module> import <names>`; `names == None` is the star form.
    pub fn from_import(
        module: impl Into<String>,
        level: usize,
        names: Option<BTreeSet<String>>,
        line: usize,
    ) -> Self {
        Self {
            kind: if level > 0 {
                ImportKind::Relative
            } else {
                ImportKind::Absolute
            },
            module: module.into(),
            names,
            level,
            line,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.names.is_none()
    }

    pub fn segments(&self) -> Vec<&str> {
        self.module.split('.').filter(|s| !s.is_empty()).collect()
    }
}
