//! Relevance scoring of artifacts against a task

use crate::config::ScoringConfig;
use crate::index::CodebaseIndex;
use crate::model::{FeatureWeights, LearningModel};
use crate::text;
use crate::types::{Artifact, ArtifactKind, FeatureVector, TaskDescriptor, TaskType};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Below this many artifacts, scoring stays on the calling thread
const PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArtifact {
    pub path: String,
    /// Relevance in [0,1]
    pub score: f64,
    pub features: FeatureVector,
}

/// Deterministic ranking: higher score, then higher dependency proximity,
/// then shorter path, then path order
pub fn rank_order(a: &ScoredArtifact, b: &ScoredArtifact) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.features
                .dependency_proximity
                .partial_cmp(&a.features.dependency_proximity)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.path.len().cmp(&b.path.len()))
        .then_with(|| a.path.cmp(&b.path))
}

/// Features that depend only on one artifact and the task
#[derive(Debug, Clone, Copy, Default)]
struct DirectFeatures {
    keyword_match: f64,
    name_match: f64,
    type_match: f64,
    recency: f64,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score every artifact of `index` against `task`.
    ///
    /// `seeds` carries prior relevance for artifacts already known to matter
    /// (carried over from a previous profile or named by the caller); it feeds
    /// dependency proximity of their neighbours. Results are in rank order.
    pub fn score(
        &self,
        index: &CodebaseIndex,
        task: &TaskDescriptor,
        model: &LearningModel,
        seeds: &BTreeMap<String, f64>,
    ) -> Vec<ScoredArtifact> {
        let weights = model.effective_weights();
        let artifacts: Vec<&Artifact> = index.artifacts().collect();
        let direct = self.direct_all(&artifacts, task, index.built_at());

        let relevance: HashMap<&str, f64> = artifacts
            .iter()
            .zip(&direct)
            .map(|(a, d)| {
                let seed = seeds.get(&a.path).copied().unwrap_or(0.0);
                (
                    a.path.as_str(),
                    d.keyword_match.max(d.name_match).max(seed).clamp(0.0, 1.0),
                )
            })
            .collect();

        let mut scored: Vec<ScoredArtifact> = artifacts
            .iter()
            .zip(&direct)
            .map(|(artifact, d)| {
                let proximity =
                    self.proximity(index, model, &artifact.path, |p| relevance.get(p).copied());
                assemble(&artifact.path, d, proximity, &weights)
            })
            .collect();

        scored.sort_by(rank_order);
        tracing::debug!(
            artifacts = scored.len(),
            task_type = task.task_type.as_str(),
            top = scored.first().map(|s| s.path.as_str()).unwrap_or(""),
            "scored artifacts"
        );
        scored
    }

    /// Score a single artifact; `None` when `path` is not indexed.
    ///
    /// Gives the same result as the matching entry of [`Scorer::score`].
    pub fn score_one(
        &self,
        index: &CodebaseIndex,
        task: &TaskDescriptor,
        model: &LearningModel,
        seeds: &BTreeMap<String, f64>,
        path: &str,
    ) -> Option<ScoredArtifact> {
        let artifact = index.artifact(path)?;
        let now = index.built_at();
        let direct = self.direct_features(artifact, task, now);
        let relevance = |p: &str| {
            index.artifact(p).map(|a| {
                let d = self.direct_features(a, task, now);
                let seed = seeds.get(p).copied().unwrap_or(0.0);
                d.keyword_match.max(d.name_match).max(seed).clamp(0.0, 1.0)
            })
        };
        let proximity = self.proximity(index, model, path, relevance);
        Some(assemble(path, &direct, proximity, &model.effective_weights()))
    }

    fn direct_all(
        &self,
        artifacts: &[&Artifact],
        task: &TaskDescriptor,
        now: DateTime<Utc>,
    ) -> Vec<DirectFeatures> {
        let workers = self.config.workers.max(1);
        if workers == 1 || artifacts.len() < PARALLEL_THRESHOLD {
            return artifacts
                .iter()
                .map(|a| self.direct_features(a, task, now))
                .collect();
        }

        let chunk_size = artifacts.len().div_ceil(workers);
        std::thread::scope(|s| {
            let handles: Vec<_> = artifacts
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move || {
                        chunk
                            .iter()
                            .map(|a| self.direct_features(a, task, now))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn direct_features(
        &self,
        artifact: &Artifact,
        task: &TaskDescriptor,
        now: DateTime<Utc>,
    ) -> DirectFeatures {
        DirectFeatures {
            keyword_match: keyword_match(artifact, task),
            name_match: name_match(artifact, task),
            type_match: type_match(task.task_type, artifact),
            recency: self.recency(artifact, now),
        }
    }

    fn recency(&self, artifact: &Artifact, now: DateTime<Utc>) -> f64 {
        let age_days = (now - artifact.modified).num_seconds().max(0) as f64 / 86_400.0;
        let half_life = self.config.recency_half_life_days.max(f64::EPSILON);
        1.0 / (1.0 + age_days / half_life)
    }

    /// Best decayed relevance inherited from graph neighbours and learned
    /// co-access partners
    fn proximity(
        &self,
        index: &CodebaseIndex,
        model: &LearningModel,
        path: &str,
        relevance: impl Fn(&str) -> Option<f64>,
    ) -> f64 {
        let mut best: f64 = 0.0;

        for (neighbour, hop) in index.graph().neighbours_within(path, 2) {
            let decay = if hop == 1 {
                self.config.direct_decay
            } else {
                self.config.transitive_decay
            };
            if let Some(r) = relevance(neighbour) {
                best = best.max(r * decay);
            }
        }

        for (partner, _) in model.affinity.partners(path) {
            if let Some(r) = relevance(partner) {
                best = best.max(r * self.config.affinity_decay);
            }
        }

        best.clamp(0.0, 1.0)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

fn assemble(
    path: &str,
    direct: &DirectFeatures,
    proximity: f64,
    weights: &FeatureWeights,
) -> ScoredArtifact {
    let features = FeatureVector {
        keyword_match: direct.keyword_match,
        name_match: direct.name_match,
        dependency_proximity: proximity,
        type_match: direct.type_match,
        recency: direct.recency,
    };
    ScoredArtifact {
        path: path.to_string(),
        score: weights.combine(&features),
        features,
    }
}

fn keyword_match(artifact: &Artifact, task: &TaskDescriptor) -> f64 {
    if task.terms.is_empty() {
        return 0.0;
    }
    let hits = task
        .terms
        .iter()
        .filter(|t| artifact.terms.contains(t.as_str()))
        .count();
    hits as f64 / task.terms.len() as f64
}

fn name_match(artifact: &Artifact, task: &TaskDescriptor) -> f64 {
    if task.mentions.iter().any(|m| artifact.is_named_by(m)) {
        return 1.0;
    }
    if task.terms.is_empty() {
        return 0.0;
    }
    let path_terms = text::path_terms(&artifact.path);
    let hits = task
        .terms
        .iter()
        .filter(|t| path_terms.contains(t.as_str()))
        .count();
    hits as f64 / task.terms.len() as f64
}

/// How well an artifact kind serves a task type; general tasks fall back
/// to structural importance
fn type_match(task_type: TaskType, artifact: &Artifact) -> f64 {
    use ArtifactKind::*;
    let value = match (task_type, artifact.kind) {
        (TaskType::General, _) => artifact.importance,

        (TaskType::Debugging, Source) => 1.0,
        (TaskType::Debugging, EntryPoint) => 0.8,
        (TaskType::Debugging, Test) => 0.6,
        (TaskType::Debugging, Config) => 0.4,
        (TaskType::Debugging, Doc) => 0.1,

        (TaskType::Feature, Source) => 1.0,
        (TaskType::Feature, EntryPoint) => 0.8,
        (TaskType::Feature, Config) | (TaskType::Feature, Test) => 0.4,
        (TaskType::Feature, Doc) => 0.2,

        (TaskType::Refactor, Source) => 1.0,
        (TaskType::Refactor, EntryPoint) => 0.6,
        (TaskType::Refactor, Test) => 0.5,
        (TaskType::Refactor, Config) => 0.2,
        (TaskType::Refactor, Doc) => 0.1,

        (TaskType::Testing, Test) => 1.0,
        (TaskType::Testing, Source) => 0.6,
        (TaskType::Testing, EntryPoint) => 0.4,
        (TaskType::Testing, Config) => 0.3,
        (TaskType::Testing, Doc) => 0.1,

        (TaskType::Documentation, Doc) => 1.0,
        (TaskType::Documentation, EntryPoint) => 0.5,
        (TaskType::Documentation, Source) | (TaskType::Documentation, Config) => 0.3,
        (TaskType::Documentation, Test) => 0.1,
    };
    value.clamp(0.0, 1.0)
}
