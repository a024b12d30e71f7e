//! Immutable codebase index: artifacts, graph and diagnostics

use crate::graph::{Cycle, DependencyGraph};
use crate::types::{Artifact, ScanWarning};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    Cancelled,
    TimedOut,
}

/// Whether every enumerated artifact was visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    Partial {
        reason: PartialReason,
        scanned: usize,
        total: usize,
    },
}

/// A recognised repository layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalPattern {
    pub name: String,
    /// Fraction of the template's signatures present, in [0,1]
    pub confidence: f64,
    pub matched: Vec<String>,
}

/// Snapshot of a repository produced by one indexing call.
///
/// The index is never mutated after construction; re-indexing produces a new
/// value.
#[derive(Debug, Clone)]
pub struct CodebaseIndex {
    root: PathBuf,
    artifacts: BTreeMap<String, Artifact>,
    graph: DependencyGraph,
    cycles: Vec<Cycle>,
    warnings: Vec<ScanWarning>,
    patterns: Vec<ArchitecturalPattern>,
    completeness: Completeness,
    built_at: DateTime<Utc>,
}

impl CodebaseIndex {
    /// Build an index from artifacts whose `imports` are already resolved.
    ///
    /// Imports naming unknown artifacts are dropped, `imported_by` is
    /// recomputed from the imports, and cycles are detected.
    pub fn new(root: impl Into<PathBuf>, artifacts: Vec<Artifact>) -> Self {
        let mut by_path: BTreeMap<String, Artifact> = artifacts
            .into_iter()
            .map(|a| (a.path.clone(), a))
            .collect();

        let known: BTreeSet<String> = by_path.keys().cloned().collect();
        let mut graph = DependencyGraph::new();
        for path in &known {
            graph.add_node(path);
        }

        let mut importers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for artifact in by_path.values_mut() {
            artifact.imports.retain(|target| known.contains(target));
            artifact.imports.sort();
            artifact.imports.dedup();
            for target in &artifact.imports {
                graph.add_edge(&artifact.path, target);
                importers
                    .entry(target.clone())
                    .or_default()
                    .insert(artifact.path.clone());
            }
        }
        for (path, artifact) in by_path.iter_mut() {
            artifact.imported_by = importers
                .get(path)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
        }

        let cycles = graph.cycles();
        if !cycles.is_empty() {
            tracing::info!(count = cycles.len(), "dependency cycles detected");
        }

        Self {
            root: root.into(),
            artifacts: by_path,
            graph,
            cycles,
            warnings: Vec::new(),
            patterns: Vec::new(),
            completeness: Completeness::Complete,
            built_at: Utc::now(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<ScanWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<ArchitecturalPattern>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_completeness(mut self, completeness: Completeness) -> Self {
        self.completeness = completeness;
        self
    }

    pub fn with_built_at(mut self, built_at: DateTime<Utc>) -> Self {
        self.built_at = built_at;
        self
    }

    /// Derive a new index carrying the given access counts
    pub fn with_access_counts(&self, counts: &BTreeMap<String, u64>) -> Self {
        let mut next = self.clone();
        for (path, artifact) in next.artifacts.iter_mut() {
            artifact.access_count = counts.get(path).copied().unwrap_or(0);
        }
        next
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.get(path)
    }

    /// Artifacts in path order
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    pub fn patterns(&self) -> &[ArchitecturalPattern] {
        &self.patterns
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.completeness, Completeness::Complete)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn total_size(&self) -> usize {
        self.artifacts.values().map(|a| a.size).sum()
    }
}
