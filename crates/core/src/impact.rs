//! Affected-test resolution over the dependency graph.

use crate::change::ChangeRecord;
use crate::engine::DependencyGraph;
use crate::project::Catalog;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Outcome of one selection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Test files to run, sorted.
    pub tests: BTreeSet<String>,
    /// Files reached by plain reverse reachability from the changed files.
    pub coarse: BTreeSet<String>,
    /// Files that survive the first-hop symbol filter. Always within `coarse`.
    pub selected: BTreeSet<String>,
    pub run_all: bool,
}

impl Selection {
    pub fn everything(catalog: &Catalog) -> Self {
        Self {
            tests: catalog.test_files(),
            coarse: BTreeSet::new(),
            selected: BTreeSet::new(),
            run_all: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

pub struct ImpactResolver<'a> {
    graph: &'a DependencyGraph,
    catalog: &'a Catalog,
}

impl<'a> ImpactResolver<'a> {
    pub fn new(graph: &'a DependencyGraph, catalog: &'a Catalog) -> Self {
        Self { graph, catalog }
    }

    /// Selects the tests that may observe `records`.
    ///
    /// The symbol filter applies to the first hop only: an importer that
    /// pulls none of the changed names is dropped, but once a file is
    /// affected, everything above it is affected whole.
    pub fn resolve(&self, records: &BTreeMap<String, ChangeRecord>) -> Selection {
        let seeds: BTreeSet<&str> = records.keys().map(String::as_str).collect();

        let mut coarse = self.graph.reverse_reachable(seeds.iter().copied());
        coarse.extend(seeds.iter().map(|s| s.to_string()));

        let mut frontier: BTreeSet<&str> = BTreeSet::new();
        for (seed, record) in records {
            for (dependent, symbols) in self.graph.dependents_of(seed) {
                if record.qualifies(symbols) {
                    frontier.insert(dependent);
                } else {
                    debug!(
                        "{} imports {} from {}, unaffected by {}",
                        dependent, symbols, seed, record
                    );
                }
            }
        }

        let mut selected = self.graph.reverse_reachable(frontier.iter().copied());
        selected.extend(seeds.iter().map(|s| s.to_string()));
        debug_assert!(selected.is_subset(&coarse));

        let tests: BTreeSet<String> = selected
            .iter()
            .filter(|path| self.catalog.is_test(path))
            .cloned()
            .collect();

        debug!(
            "Selection: {} seeds, {} coarse, {} selected, {} tests",
            seeds.len(),
            coarse.len(),
            selected.len(),
            tests.len()
        );

        Selection {
            tests,
            coarse,
            selected,
            run_all: false,
        }
    }
}
