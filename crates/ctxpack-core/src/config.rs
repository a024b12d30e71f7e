//! Engine configuration

use crate::model::FeatureWeights;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relevance scoring knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Proximity decay across a direct import edge
    pub direct_decay: f64,
    /// Proximity decay across two hops
    pub transitive_decay: f64,
    /// Proximity decay between learned co-access partners
    pub affinity_decay: f64,
    /// Age in days at which recency halves
    pub recency_half_life_days: f64,
    /// Parallel workers for per-artifact features
    pub workers: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            direct_decay: 0.7,
            transitive_decay: 0.35,
            affinity_decay: 0.5,
            recency_half_life_days: 7.0,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Default budget in tokens
    pub budget: usize,
    /// Artifacts scoring below this are excluded outright
    pub min_relevance: f64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            budget: 8000,
            min_relevance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// η: maximum movement of any weight per session
    pub learning_rate: f64,
    /// Co-access count a pair must exceed to become affine
    pub affinity_threshold: u32,
    /// Share of the previous delta kept when smoothing
    pub smoothing: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            affinity_threshold: 3,
            smoothing: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub workers: usize,
    pub timeout_secs: u64,
    /// Larger files are skipped with a warning
    pub max_file_bytes: u64,
    /// Directory names never descended into
    pub ignore_dirs: Vec<String>,
}

impl IndexingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_secs: 30,
            max_file_bytes: 1024 * 1024,
            ignore_dirs: [
                ".git",
                ".hg",
                ".svn",
                "target",
                "node_modules",
                "dist",
                "build",
                "__pycache__",
                ".venv",
                "venv",
                ".idea",
                ".vscode",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Engine configuration, loadable from `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub packing: PackingConfig,
    pub learning: LearningConfig,
    pub indexing: IndexingConfig,
    /// Weights a fresh learning model starts from
    pub initial_weights: FeatureWeights,
    /// Re-scored artifacts at or above this carry over on a switch
    pub carry_over_threshold: f64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            packing: PackingConfig::default(),
            learning: LearningConfig::default(),
            indexing: IndexingConfig::default(),
            initial_weights: FeatureWeights::DEFAULT,
            carry_over_threshold: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
