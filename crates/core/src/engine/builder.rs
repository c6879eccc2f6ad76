//! Graph builder for creating dependency graphs
//!
//! `DependencyGraphBuilder` is the only mutable stage. It collapses duplicate
//! (from, to) pairs into one edge and drops self-loops, then freezes into an
//! immutable `DependencyGraph` via `build()`.

use super::graph::{DependencyGraph, DependencyGraphInner};
use crate::model::ResolvedEdge;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use tracing::debug;

pub struct DependencyGraphBuilder {
    inner: DependencyGraphInner,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self {
            inner: DependencyGraphInner {
                topology: DiGraph::new(),
                path_index: HashMap::new(),
            },
        }
    }

    /// Adds a node if the path is not present yet.
    pub fn add_node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.inner.path_index.get(path) {
            return idx;
        }
        let idx = self.inner.topology.add_node(path.to_string());
        self.inner.path_index.insert(path.to_string(), idx);
        idx
    }

    /// Adds an edge, merging its symbol-set into an existing one between the
    /// same pair.
    pub fn add_edge(&mut self, edge: ResolvedEdge) {
        if edge.from == edge.to {
            debug!("Ignoring self import in {}", edge.from);
            return;
        }
        let from = self.add_node(&edge.from);
        let to = self.add_node(&edge.to);
        match self.inner.topology.find_edge(from, to) {
            Some(existing) => {
                if let Some(weight) = self.inner.topology.edge_weight_mut(existing) {
                    weight.merge(&edge.symbols);
                }
            }
            None => {
                self.inner.topology.add_edge(from, to, edge.symbols);
            }
        }
    }

    pub fn add_edges(&mut self, edges: impl IntoIterator<Item = ResolvedEdge>) {
        for edge in edges {
            self.add_edge(edge);
        }
    }

    pub fn build(self) -> DependencyGraph {
        debug!(
            "Dependency graph built: {} nodes, {} edges",
            self.inner.topology.node_count(),
            self.inner.topology.edge_count()
        );
        DependencyGraph::from_inner(self.inner)
    }
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolSet;

    fn edge(from: &str, to: &str, symbols: SymbolSet) -> ResolvedEdge {
        ResolvedEdge {
            from: from.to_string(),
            to: to.to_string(),
            symbols,
        }
    }

    #[test]
    fn test_isolated_nodes_are_kept() {
        let mut builder = DependencyGraphBuilder::new();
        builder.add_node("lonely.py");
        builder.add_node("lonely.py");
        let graph = builder.build();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains("lonely.py"));
    }

    #[test]
    fn test_duplicate_edges_collapse_by_union() {
        let mut builder = DependencyGraphBuilder::new();
        builder.add_edge(edge("a.py", "b.py", SymbolSet::names(["x"])));
        builder.add_edge(edge("a.py", "b.py", SymbolSet::names(["y"])));
        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependencies_of("a.py")[0].1, &SymbolSet::names(["x", "y"]));
    }

    #[test]
    fn test_all_dominates_on_collapse() {
        let mut builder = DependencyGraphBuilder::new();
        builder.add_edge(edge("a.py", "b.py", SymbolSet::names(["x"])));
        builder.add_edge(edge("a.py", "b.py", SymbolSet::All));
        builder.add_edge(edge("a.py", "b.py", SymbolSet::names(["z"])));
        let graph = builder.build();
        assert!(graph.dependencies_of("a.py")[0].1.is_all());
    }

    #[test]
    fn test_self_loops_are_dropped() {
        let mut builder = DependencyGraphBuilder::new();
        builder.add_edge(edge("a.py", "a.py", SymbolSet::All));
        let graph = builder.build();
        assert_eq!(graph.edge_count(), 0);
    }
}
