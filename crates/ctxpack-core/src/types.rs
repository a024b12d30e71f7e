//! Core records: artifacts, tasks, tiers and context profiles

use crate::classifier::TaskClassifier;
use crate::text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of repository artifact, inferred from its path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Source,
    Config,
    Test,
    Doc,
    EntryPoint,
}

/// An indexed repository unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    /// Size in estimated tokens
    pub size: usize,
    pub kind: ArtifactKind,
    /// Resolved paths this artifact references
    pub imports: Vec<String>,
    /// Resolved paths referencing this artifact
    pub imported_by: Vec<String>,
    pub modified: DateTime<Utc>,
    pub access_count: u64,
    pub importance: f64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub terms: BTreeSet<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl Artifact {
    pub fn new(
        path: impl Into<String>,
        kind: ArtifactKind,
        content: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: ctxpack_telemetry::estimate_tokens(&content),
            kind,
            imports: Vec::new(),
            imported_by: Vec::new(),
            modified,
            access_count: 0,
            importance: 0.0,
            terms: text::content_terms(&content),
            signatures: Vec::new(),
            content,
        }
    }

    /// Final path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Whether free-text `mention` names this artifact
    pub fn is_named_by(&self, mention: &str) -> bool {
        self.path == mention
            || self.file_name() == mention
            || self.path.ends_with(&format!("/{}", mention))
    }
}

/// Inclusion depth of an artifact in a context profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Full content
    High,
    /// Compressed signatures or summary
    Medium,
    /// Path-only reference
    Low,
    Excluded,
}

impl Tier {
    pub fn is_included(self) -> bool {
        !matches!(self, Tier::Excluded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
            Tier::Excluded => "excluded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Debugging,
    Feature,
    Refactor,
    Testing,
    Documentation,
    General,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Debugging => "debugging",
            TaskType::Feature => "feature",
            TaskType::Refactor => "refactor",
            TaskType::Testing => "testing",
            TaskType::Documentation => "documentation",
            TaskType::General => "general",
        }
    }
}

/// A natural-language task plus what was derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub text: String,
    pub task_type: TaskType,
    pub terms: Vec<String>,
    pub mentions: Vec<String>,
}

impl TaskDescriptor {
    pub fn new(text: impl Into<String>, classifier: &dyn TaskClassifier) -> Self {
        let text = text.into();
        Self {
            task_type: classifier.classify(&text),
            terms: text::task_terms(&text),
            mentions: text::file_mentions(&text),
            text,
        }
    }
}

/// Scoring features, in weight-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    KeywordMatch,
    NameMatch,
    DependencyProximity,
    TypeMatch,
    Recency,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::KeywordMatch,
        Feature::NameMatch,
        Feature::DependencyProximity,
        Feature::TypeMatch,
        Feature::Recency,
    ];
}

/// Per-artifact feature values, each in [0,1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub keyword_match: f64,
    pub name_match: f64,
    pub dependency_proximity: f64,
    pub type_match: f64,
    pub recency: f64,
}

impl FeatureVector {
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
}

/// What a profile entry carries for the assistant layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum EntryContent {
    Full(String),
    Compressed(String),
    Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub path: String,
    pub tier: Tier,
    pub score: f64,
    pub features: FeatureVector,
    /// Tokens this entry consumes from the budget
    pub size: usize,
    pub content: EntryContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    BelowRelevance { score: f64, threshold: f64 },
    BudgetExhausted { needed: usize, remaining: usize },
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::BelowRelevance { score, threshold } => {
                write!(f, "relevance {:.2} below threshold {:.2}", score, threshold)
            }
            ExclusionReason::BudgetExhausted { needed, remaining } => write!(
                f,
                "budget exhausted ({} tokens needed, {} remaining)",
                needed, remaining
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub path: String,
    pub reason: ExclusionReason,
}

/// The bounded, tiered working set produced for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextProfile {
    pub id: String,
    pub task: TaskDescriptor,
    pub entries: Vec<ProfileEntry>,
    pub total_size: usize,
    pub budget: usize,
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub index_complete: bool,
    pub created_at: DateTime<Utc>,
}

impl ContextProfile {
    pub fn entry(&self, path: &str) -> Option<&ProfileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn tier_of(&self, path: &str) -> Option<Tier> {
        self.entry(path).map(|e| e.tier)
    }

    pub fn entries_in(&self, tier: Tier) -> impl Iterator<Item = &ProfileEntry> {
        self.entries.iter().filter(move |e| e.tier == tier)
    }

    pub fn included_paths(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.tier.is_included())
            .map(|e| e.path.clone())
            .collect()
    }

    /// Share of the budget consumed, in [0,1]
    pub fn utilization(&self) -> f64 {
        if self.budget == 0 {
            return 0.0;
        }
        (self.total_size as f64 / self.budget as f64).min(1.0)
    }

    /// Return a copy carrying additional notes
    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes.extend(notes);
        self
    }
}

/// An artifact skipped during indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub path: String,
    pub message: String,
}
