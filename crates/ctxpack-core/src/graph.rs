//! Artifact dependency graph

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// A strongly connected group of artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Sorted member paths
    pub members: Vec<String>,
    /// Edges between members, sorted
    pub edges: Vec<(String, String)>,
}

/// Directed import graph over artifact paths (edge `a -> b`: a imports b)
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.nodes.insert(path.to_string(), idx);
        idx
    }

    /// Add `from -> to`, creating nodes as needed; duplicate edges are ignored
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let a = self.add_node(from);
        let b = self.add_node(to);
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Paths `path` imports
    pub fn imports(&self, path: &str) -> Vec<&str> {
        self.directed_neighbours(path, petgraph::Direction::Outgoing)
    }

    /// Paths importing `path`
    pub fn importers(&self, path: &str) -> Vec<&str> {
        self.directed_neighbours(path, petgraph::Direction::Incoming)
    }

    fn directed_neighbours(&self, path: &str, dir: petgraph::Direction) -> Vec<&str> {
        let Some(&idx) = self.nodes.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(idx, dir)
            .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Artifacts reachable from `path` within `max_hops` edges in either
    /// direction, with their hop distance. The origin is not included.
    pub fn neighbours_within(&self, path: &str, max_hops: usize) -> Vec<(&str, usize)> {
        let Some(&origin) = self.nodes.get(path) else {
            return Vec::new();
        };

        let mut hops: HashMap<NodeIndex, usize> = HashMap::new();
        hops.insert(origin, 0);
        let mut queue = VecDeque::from([origin]);

        while let Some(current) = queue.pop_front() {
            let depth = hops[&current];
            if depth == max_hops {
                continue;
            }
            for next in self.graph.neighbors_undirected(current) {
                if !hops.contains_key(&next) {
                    hops.insert(next, depth + 1);
                    queue.push_back(next);
                }
            }
        }

        let mut out: Vec<(&str, usize)> = hops
            .into_iter()
            .filter(|(idx, _)| *idx != origin)
            .filter_map(|(idx, hop)| self.graph.node_weight(idx).map(|p| (p.as_str(), hop)))
            .collect();
        out.sort_unstable();
        out
    }

    /// Dependency cycles: components with more than one member, or a
    /// self-import
    pub fn cycles(&self) -> Vec<Cycle> {
        let mut cycles = Vec::new();
        for component in tarjan_scc(&self.graph) {
            let self_loop = component.len() == 1
                && self.graph.find_edge(component[0], component[0]).is_some();
            if component.len() < 2 && !self_loop {
                continue;
            }

            let members: BTreeSet<NodeIndex> = component.iter().copied().collect();
            let mut edges: Vec<(String, String)> = self
                .graph
                .edge_references()
                .filter(|e| members.contains(&e.source()) && members.contains(&e.target()))
                .map(|e| (self.graph[e.source()].clone(), self.graph[e.target()].clone()))
                .collect();
            edges.sort();

            let mut names: Vec<String> = component
                .iter()
                .map(|idx| self.graph[*idx].clone())
                .collect();
            names.sort();

            cycles.push(Cycle {
                members: names,
                edges,
            });
        }
        cycles.sort_by(|a, b| a.members.cmp(&b.members));
        cycles
    }
}
