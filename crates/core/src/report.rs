use crate::engine::DependencyGraph;
use crate::model::{FileRole, SymbolSet};
use crate::project::Catalog;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub path: String,
    pub symbols: SymbolSet,
}

/// Dependency view of one file: what it imports, what reaches it, and which
/// tests cover it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub module: String,
    pub role: FileRole,
    pub dependencies: Vec<DependencyEntry>,
    pub importers: Vec<DependencyEntry>,
    /// Every file that transitively imports this one.
    pub dependents: BTreeSet<String>,
    /// Test files among `dependents`, or the file itself when it is a test.
    pub tests: BTreeSet<String>,
}

impl FileReport {
    pub fn build(path: &str, catalog: &Catalog, graph: &DependencyGraph) -> Option<Self> {
        let file = catalog.get(path)?;

        let entries = |pairs: Vec<(&str, &SymbolSet)>| -> Vec<DependencyEntry> {
            pairs
                .into_iter()
                .map(|(path, symbols)| DependencyEntry {
                    path: path.to_string(),
                    symbols: symbols.clone(),
                })
                .collect()
        };

        let mut dependents = graph.reverse_reachable([path]);
        dependents.remove(path);

        let mut tests: BTreeSet<String> = dependents
            .iter()
            .filter(|p| catalog.is_test(p))
            .cloned()
            .collect();
        if file.is_test() {
            tests.insert(path.to_string());
        }

        Some(Self {
            path: path.to_string(),
            module: file.module.clone(),
            role: file.role,
            dependencies: entries(graph.dependencies_of(path)),
            importers: entries(graph.dependents_of(path)),
            dependents,
            tests,
        })
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.path, self.module)?;
        writeln!(f, "  imports:")?;
        if self.dependencies.is_empty() {
            writeln!(f, "    (none)")?;
        }
        for dep in &self.dependencies {
            writeln!(f, "    {} {}", dep.path, dep.symbols)?;
        }
        writeln!(f, "  imported by:")?;
        if self.dependents.is_empty() {
            writeln!(f, "    (none)")?;
        }
        for dependent in &self.dependents {
            writeln!(f, "    {}", dependent)?;
        }
        writeln!(f, "  covered by:")?;
        if self.tests.is_empty() {
            writeln!(f, "    (no tests)")?;
        }
        for test in &self.tests {
            writeln!(f, "    {}", test)?;
        }
        Ok(())
    }
}
