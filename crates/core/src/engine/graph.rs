//! Arc-wrapped immutable dependency graph
//!
//! Nodes are files addressed by their project-relative path; an edge `a -> b`
//! means `a` imports from `b` and carries the imported `SymbolSet`. petgraph
//! keeps incoming and outgoing lists for every node, so forward and reverse
//! adjacency are the same edges walked in opposite directions.

use crate::model::{ResolvedEdge, SymbolSet};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Immutable dependency graph (cheap to clone via Arc)
#[derive(Clone)]
pub struct DependencyGraph {
    inner: Arc<DependencyGraphInner>,
}

pub(crate) struct DependencyGraphInner {
    pub topology: DiGraph<String, SymbolSet>,
    pub path_index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn empty() -> Self {
        Self::from_inner(DependencyGraphInner {
            topology: DiGraph::new(),
            path_index: HashMap::new(),
        })
    }

    pub(crate) fn from_inner(inner: DependencyGraphInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn builder() -> super::DependencyGraphBuilder {
        super::DependencyGraphBuilder::new()
    }

    // ---- Read-only accessors ----

    pub fn contains(&self, path: &str) -> bool {
        self.inner.path_index.contains_key(path)
    }

    pub fn node_count(&self) -> usize {
        self.inner.topology.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.topology.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.inner.topology.node_weights().map(String::as_str)
    }

    pub fn edges(&self) -> Vec<ResolvedEdge> {
        let topology = &self.inner.topology;
        let mut edges: Vec<ResolvedEdge> = topology
            .edge_references()
            .map(|e| ResolvedEdge {
                from: topology[e.source()].clone(),
                to: topology[e.target()].clone(),
                symbols: e.weight().clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        edges
    }

    /// Files `path` imports from, with what it imports.
    pub fn dependencies_of(&self, path: &str) -> Vec<(&str, &SymbolSet)> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Files that import from `path`, with what they import.
    pub fn dependents_of(&self, path: &str) -> Vec<(&str, &SymbolSet)> {
        self.neighbors(path, Direction::Incoming)
    }

    /// Everything that transitively imports any of `seeds`. Seeds are part of
    /// the result when present in the graph.
    pub fn reverse_reachable<'a, I>(&self, seeds: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.reachable(seeds, Direction::Incoming)
    }

    /// Everything any of `seeds` transitively imports. Seeds are part of the
    /// result when present in the graph.
    pub fn forward_reachable<'a, I>(&self, seeds: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.reachable(seeds, Direction::Outgoing)
    }

    fn neighbors(&self, path: &str, direction: Direction) -> Vec<(&str, &SymbolSet)> {
        let Some(&idx) = self.inner.path_index.get(path) else {
            return Vec::new();
        };
        let topology = &self.inner.topology;
        let mut out: Vec<(&str, &SymbolSet)> = topology
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (topology[other].as_str(), e.weight())
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Breadth-first walk with a visited set: every node is enqueued at most
    /// once, which is what keeps import cycles finite.
    fn reachable<'a, I>(&self, seeds: I, direction: Direction) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let topology = &self.inner.topology;
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        for seed in seeds {
            if let Some(&idx) = self.inner.path_index.get(seed) {
                if visited.insert(idx) {
                    queue.push_back(idx);
                }
            }
        }

        while let Some(idx) = queue.pop_front() {
            for next in topology.neighbors_directed(idx, direction) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        visited
            .into_iter()
            .map(|idx| topology[idx].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, symbols: SymbolSet) -> ResolvedEdge {
        ResolvedEdge {
            from: from.to_string(),
            to: to.to_string(),
            symbols,
        }
    }

    fn chain() -> DependencyGraph {
        // test_auth -> auth -> models -> validators
        let mut builder = DependencyGraph::builder();
        builder.add_edges(vec![
            edge("auth.py", "models.py", SymbolSet::names(["User"])),
            edge("models.py", "validators.py", SymbolSet::names(["validate_email"])),
            edge("test_auth.py", "auth.py", SymbolSet::names(["AuthService"])),
        ]);
        builder.build()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::empty();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.reverse_reachable(["x.py"]).is_empty());
    }

    #[test]
    fn test_reverse_reachability_is_transitive() {
        let graph = chain();
        let reached = graph.reverse_reachable(["validators.py"]);
        let expected: BTreeSet<String> = ["auth.py", "models.py", "test_auth.py", "validators.py"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(reached, expected);
    }

    #[test]
    fn test_forward_reachability() {
        let graph = chain();
        let reached = graph.forward_reachable(["auth.py"]);
        assert!(reached.contains("validators.py"));
        assert!(!reached.contains("test_auth.py"));
    }

    #[test]
    fn test_two_node_cycle_terminates() {
        let mut builder = DependencyGraph::builder();
        builder.add_edges(vec![
            edge("a.py", "b.py", SymbolSet::All),
            edge("b.py", "a.py", SymbolSet::All),
            edge("test_a.py", "a.py", SymbolSet::All),
        ]);
        let graph = builder.build();

        let reached = graph.reverse_reachable(["b.py"]);
        assert_eq!(reached.len(), 3);
        assert!(reached.contains("test_a.py"));

        let forward = graph.forward_reachable(["a.py"]);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn test_adjacency_views_agree() {
        let graph = chain();
        assert_eq!(graph.edge_count(), 3);
        let deps = graph.dependencies_of("models.py");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0, "validators.py");
        let dependents = graph.dependents_of("models.py");
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].0, "auth.py");
        assert_eq!(dependents[0].1, &SymbolSet::names(["User"]));
        assert!(graph.dependents_of("unknown.py").is_empty());
    }
}
