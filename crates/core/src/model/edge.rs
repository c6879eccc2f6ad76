use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The symbols one file takes from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolSet {
    /// Any change in the target affects the importer.
    All,
    Names(BTreeSet<String>),
}

impl SymbolSet {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SymbolSet::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SymbolSet::All)
    }

    /// Set union; `All` absorbs any finite set.
    pub fn merge(&mut self, other: &SymbolSet) {
        match (&mut *self, other) {
            (SymbolSet::All, _) => {}
            (_, SymbolSet::All) => *self = SymbolSet::All,
            (SymbolSet::Names(mine), SymbolSet::Names(theirs)) => {
                mine.extend(theirs.iter().cloned());
            }
        }
    }

    /// True when a change to `changed` can reach the importer through this set.
    pub fn intersects(&self, changed: &BTreeSet<String>) -> bool {
        match self {
            SymbolSet::All => true,
            SymbolSet::Names(names) => names.iter().any(|n| changed.contains(n)),
        }
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolSet::All => write!(f, "*"),
            SymbolSet::Names(names) => {
                let joined: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
        }
    }
}

/// A file-level dependency: `from` imports `symbols` out of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEdge {
    pub from: String,
    pub to: String,
    pub symbols: SymbolSet,
}
