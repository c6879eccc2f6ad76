//! Change mapping: diff hunks plus symbol extents in, one `ChangeRecord` per
//! changed file out.

use crate::model::{ParsedSource, SymbolSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Modified,
    Added,
    Deleted,
}

/// One region of a file's new version touched by the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hunk {
    /// Inclusive, 1-based line range present in the new version.
    Lines { start: usize, end: usize },
    /// Lines removed right after `after` (0 = top of file) with nothing added.
    Removal { after: usize },
}

impl Hunk {
    pub fn lines(start: usize, end: usize) -> Self {
        Hunk::Lines {
            start,
            end: end.max(start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Project-relative, `/`-separated.
    pub path: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub hunks: Vec<Hunk>,
}

impl FileChange {
    pub fn modified(path: impl Into<String>, hunks: Vec<Hunk>) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Modified,
            hunks,
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Added,
            hunks: Vec::new(),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: ChangeStatus::Deleted,
            hunks: Vec::new(),
        }
    }
}

/// Everything the diff collaborator reports for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    /// Caller's escape hatch: analysis is not trusted, select every test.
    #[serde(default)]
    pub run_all: bool,
}

impl ChangeSet {
    pub fn new(files: Vec<FileChange>) -> Self {
        Self {
            files,
            run_all: false,
        }
    }

    pub fn run_all() -> Self {
        Self {
            files: Vec::new(),
            run_all: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn deleted_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.status == ChangeStatus::Deleted)
            .map(|f| f.path.clone())
            .collect()
    }

    /// Collapses repeated entries for one path. Added/deleted win over
    /// modified; hunks are concatenated.
    pub fn merged(&self) -> BTreeMap<String, FileChange> {
        let mut merged: BTreeMap<String, FileChange> = BTreeMap::new();
        for change in &self.files {
            match merged.get_mut(&change.path) {
                Some(existing) => {
                    if existing.status == ChangeStatus::Modified {
                        existing.status = change.status;
                    }
                    existing.hunks.extend(change.hunks.iter().copied());
                }
                None => {
                    merged.insert(change.path.clone(), change.clone());
                }
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WholeReason {
    Unparsable,
    Added,
    Deleted,
    /// A changed line sits outside every symbol extent.
    UnmappedLines,
    /// A hunk removed lines without adding any.
    LinesRemoved,
    /// Modified, but no hunks were supplied.
    NoLineData,
    /// Not part of the catalog (excluded, or not a source file).
    NotIndexed,
}

impl fmt::Display for WholeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WholeReason::Unparsable => "file could not be parsed",
            WholeReason::Added => "file was added",
            WholeReason::Deleted => "file was deleted",
            WholeReason::UnmappedLines => "change outside any function or class",
            WholeReason::LinesRemoved => "lines were removed",
            WholeReason::NoLineData => "no line information",
            WholeReason::NotIndexed => "file is not indexed",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeRecord {
    Precise(BTreeSet<String>),
    Whole(WholeReason),
}

impl ChangeRecord {
    pub fn is_whole(&self) -> bool {
        matches!(self, ChangeRecord::Whole(_))
    }

    /// One-hop precision filter: does an edge importing `symbols` from the
    /// changed file see this change?
    pub fn qualifies(&self, symbols: &SymbolSet) -> bool {
        match self {
            ChangeRecord::Whole(_) => true,
            ChangeRecord::Precise(names) => symbols.intersects(names),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeRecord::Whole(reason) => write!(f, "whole file ({})", reason),
            ChangeRecord::Precise(names) => {
                let joined: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "symbols: {}", joined.join(", "))
            }
        }
    }
}

pub struct ChangeMapper;

impl ChangeMapper {
    /// `parsed` is `None` when the file is not in the index.
    pub fn map_file(change: &FileChange, parsed: Option<&ParsedSource>) -> ChangeRecord {
        match change.status {
            ChangeStatus::Added => return ChangeRecord::Whole(WholeReason::Added),
            ChangeStatus::Deleted => return ChangeRecord::Whole(WholeReason::Deleted),
            ChangeStatus::Modified => {}
        }

        let Some(parsed) = parsed else {
            return ChangeRecord::Whole(WholeReason::NotIndexed);
        };
        if parsed.parse_failed {
            return ChangeRecord::Whole(WholeReason::Unparsable);
        }
        if change.hunks.is_empty() {
            return ChangeRecord::Whole(WholeReason::NoLineData);
        }

        let mut names = BTreeSet::new();
        for hunk in &change.hunks {
            let (start, end) = match *hunk {
                Hunk::Lines { start, end } => (start, end),
                Hunk::Removal { .. } => return ChangeRecord::Whole(WholeReason::LinesRemoved),
            };
            for line in start..=end {
                let Some(idx) = parsed.innermost_index_at(line) else {
                    if parsed.is_blank(line) {
                        continue;
                    }
                    return ChangeRecord::Whole(WholeReason::UnmappedLines);
                };
                // Importers bind top-level names, so enclosing classes count too.
                for symbol in parsed.enclosing_chain(idx) {
                    names.insert(symbol.name.clone());
                }
            }
        }

        ChangeRecord::Precise(names)
    }
}
