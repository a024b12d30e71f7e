//! Learning model consumed by the scorer: feature weights and affinities

use crate::error::{Error, Result};
use crate::types::{Feature, FeatureVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Linear weights over scoring features; always sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub keyword_match: f64,
    pub name_match: f64,
    pub dependency_proximity: f64,
    pub type_match: f64,
    pub recency: f64,
}

impl FeatureWeights {
    pub const DEFAULT: FeatureWeights = FeatureWeights {
        keyword_match: 0.4,
        name_match: 0.2,
        dependency_proximity: 0.2,
        type_match: 0.1,
        recency: 0.1,
    };

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::KeywordMatch => self.keyword_match,
            Feature::NameMatch => self.name_match,
            Feature::DependencyProximity => self.dependency_proximity,
            Feature::TypeMatch => self.type_match,
            Feature::Recency => self.recency,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        match feature {
            Feature::KeywordMatch => self.keyword_match = value,
            Feature::NameMatch => self.name_match = value,
            Feature::DependencyProximity => self.dependency_proximity = value,
            Feature::TypeMatch => self.type_match = value,
            Feature::Recency => self.recency = value,
        }
    }

    pub fn sum(&self) -> f64 {
        Feature::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Weighted sum of a feature vector, clipped to [0,1]
    pub fn combine(&self, features: &FeatureVector) -> f64 {
        let raw: f64 = Feature::ALL
            .iter()
            .map(|f| self.get(*f) * features.get(*f))
            .sum();
        raw.clamp(0.0, 1.0)
    }

    /// Scale to sum 1; a zero vector becomes the defaults
    pub fn normalized(&self) -> FeatureWeights {
        let sum = self.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return FeatureWeights::DEFAULT;
        }
        let mut out = *self;
        for f in Feature::ALL {
            out.set(f, self.get(f) / sum);
        }
        out
    }

    /// Every weight finite, in [0,1], summing to 1
    pub fn validate(&self) -> Result<()> {
        for f in Feature::ALL {
            let w = self.get(f);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(Error::ModelCorruption(format!(
                    "weight {:?} = {} out of range",
                    f, w
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::ModelCorruption(format!(
                "weights sum to {} instead of 1",
                sum
            )));
        }
        Ok(())
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Symmetric pair counts between artifact paths.
///
/// Each pair is stored once under its lexicographically smaller path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffinityTable {
    pairs: BTreeMap<String, BTreeMap<String, u32>>,
}

impl AffinityTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Add `by` to the pair's count and return the new count
    pub fn increment(&mut self, a: &str, b: &str, by: u32) -> u32 {
        let (lo, hi) = Self::key(a, b);
        let count = self
            .pairs
            .entry(lo.to_string())
            .or_default()
            .entry(hi.to_string())
            .or_insert(0);
        *count = count.saturating_add(by);
        *count
    }

    pub fn set(&mut self, a: &str, b: &str, count: u32) {
        let (lo, hi) = Self::key(a, b);
        self.pairs
            .entry(lo.to_string())
            .or_default()
            .insert(hi.to_string(), count);
    }

    pub fn count(&self, a: &str, b: &str) -> u32 {
        let (lo, hi) = Self::key(a, b);
        self.pairs
            .get(lo)
            .and_then(|m| m.get(hi))
            .copied()
            .unwrap_or(0)
    }

    /// Every artifact paired with `path`, with counts, in path order
    pub fn partners(&self, path: &str) -> Vec<(&str, u32)> {
        let mut out: Vec<(&str, u32)> = Vec::new();
        if let Some(m) = self.pairs.get(path) {
            out.extend(m.iter().map(|(p, c)| (p.as_str(), *c)));
        }
        for (lo, m) in &self.pairs {
            if lo.as_str() < path {
                if let Some(c) = m.get(path) {
                    out.push((lo.as_str(), *c));
                }
            }
        }
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All pairs as `(a, b, count)` with `a < b`
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.pairs.iter().flat_map(|(lo, m)| {
            m.iter()
                .map(move |(hi, c)| (lo.as_str(), hi.as_str(), *c))
        })
    }
}

/// Per-project learned state, evolved only through bounded updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModel {
    /// Incremented on every committed update
    pub version: u64,
    pub weights: FeatureWeights,
    /// Exponentially smoothed effectiveness deltas
    #[serde(default)]
    pub smoothed_delta: FeatureVector,
    /// Co-access counts for every pair seen together
    #[serde(default)]
    pub co_access: AffinityTable,
    /// Pairs whose co-access count exceeded the threshold
    #[serde(default)]
    pub affinity: AffinityTable,
    #[serde(default)]
    pub access_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub sessions_observed: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LearningModel {
    pub fn new() -> Self {
        Self {
            version: 0,
            weights: FeatureWeights::DEFAULT,
            smoothed_delta: FeatureVector::default(),
            co_access: AffinityTable::new(),
            affinity: AffinityTable::new(),
            access_counts: BTreeMap::new(),
            sessions_observed: 0,
            updated_at: None,
        }
    }

    /// Weights safe to score with: the stored vector when valid, otherwise the
    /// defaults (the corruption is logged).
    pub fn effective_weights(&self) -> FeatureWeights {
        match self.weights.validate() {
            Ok(()) => self.weights,
            Err(e) => {
                tracing::warn!(version = self.version, error = %e, "using default weights");
                FeatureWeights::DEFAULT
            }
        }
    }

    /// A copy with the weight vector reset to defaults when it is corrupt.
    /// Returns the corruption that was repaired, if any.
    pub fn repaired(&self) -> (LearningModel, Option<Error>) {
        match self.weights.validate() {
            Ok(()) => (self.clone(), None),
            Err(e) => {
                tracing::warn!(version = self.version, error = %e, "resetting corrupt weights");
                let mut next = self.clone();
                next.weights = FeatureWeights::DEFAULT;
                next.smoothed_delta = FeatureVector::default();
                next.version += 1;
                next.updated_at = Some(Utc::now());
                (next, Some(e))
            }
        }
    }
}

impl Default for LearningModel {
    fn default() -> Self {
        Self::new()
    }
}
