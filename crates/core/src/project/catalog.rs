use crate::model::{FileRole, SourceFile};
use std::collections::{BTreeMap, BTreeSet};

/// The set of catalogued files for one invocation, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    files: BTreeMap<String, SourceFile>,
}

impl Catalog {
    pub fn from_files(files: impl IntoIterator<Item = SourceFile>) -> Self {
        Self {
            files: files.into_iter().map(|f| (f.path.clone(), f)).collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn is_test(&self, path: &str) -> bool {
        self.files
            .get(path)
            .map(|f| f.role == FileRole::Test)
            .unwrap_or(false)
    }

    pub fn test_files(&self) -> BTreeSet<String> {
        self.files
            .values()
            .filter(|f| f.is_test())
            .map(|f| f.path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
