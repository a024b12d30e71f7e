//! Budget-constrained tiered packing of scored artifacts

use crate::config::PackingConfig;
use crate::index::CodebaseIndex;
use crate::scorer::ScoredArtifact;
use crate::types::{
    Artifact, ContextProfile, EntryContent, Exclusion, ExclusionReason, ProfileEntry,
    TaskDescriptor, Tier,
};
use chrono::Utc;
use ctxpack_telemetry::estimate_reference_tokens;
use std::collections::BTreeSet;

/// A reduced form of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub content: String,
    /// Size in tokens
    pub size: usize,
}

/// Produces the medium-tier form of an artifact.
///
/// Returning `None` means the artifact has no useful reduced form.
pub trait Compressor: Send + Sync {
    fn compress(&self, artifact: &Artifact) -> Option<Compressed>;
}

/// Never compresses; artifacts go straight from full to reference
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn compress(&self, _artifact: &Artifact) -> Option<Compressed> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct Packer {
    config: PackingConfig,
}

impl Packer {
    pub fn new(config: PackingConfig) -> Self {
        Self { config }
    }

    pub fn min_relevance(&self) -> f64 {
        self.config.min_relevance
    }

    /// Greedily assign tiers to `scored` (in rank order) without exceeding
    /// `budget` tokens.
    ///
    /// Artifacts in `preferred` are admitted before all others, keeping their
    /// relative rank. Each artifact takes the richest form that still fits:
    /// full content, then the compressor's form, then a path reference.
    pub fn pack(
        &self,
        task: &TaskDescriptor,
        scored: &[ScoredArtifact],
        index: &CodebaseIndex,
        budget: usize,
        compressor: &dyn Compressor,
        preferred: &BTreeSet<String>,
    ) -> ContextProfile {
        let ordered = scored
            .iter()
            .filter(|s| preferred.contains(&s.path))
            .chain(scored.iter().filter(|s| !preferred.contains(&s.path)));

        let mut used = 0usize;
        let mut entries = Vec::with_capacity(scored.len());
        let mut exclusions = Vec::new();

        for candidate in ordered {
            let Some(artifact) = index.artifact(&candidate.path) else {
                tracing::debug!(path = %candidate.path, "scored artifact missing from index");
                continue;
            };
            let remaining = budget - used;

            let (tier, size, content) = if candidate.score < self.config.min_relevance {
                exclusions.push(Exclusion {
                    path: candidate.path.clone(),
                    reason: ExclusionReason::BelowRelevance {
                        score: candidate.score,
                        threshold: self.config.min_relevance,
                    },
                });
                (Tier::Excluded, 0, EntryContent::Reference)
            } else {
                match place(artifact, remaining, compressor) {
                    Some(placed) => placed,
                    None => {
                        let needed = estimate_reference_tokens(&artifact.path);
                        tracing::debug!(
                            path = %artifact.path,
                            needed,
                            remaining,
                            "budget exhausted"
                        );
                        exclusions.push(Exclusion {
                            path: candidate.path.clone(),
                            reason: ExclusionReason::BudgetExhausted { needed, remaining },
                        });
                        (Tier::Excluded, 0, EntryContent::Reference)
                    }
                }
            };

            used += size;
            entries.push(ProfileEntry {
                path: candidate.path.clone(),
                tier,
                score: candidate.score,
                features: candidate.features,
                size,
                content,
            });
        }

        let profile = ContextProfile {
            id: uuid::Uuid::new_v4().to_string(),
            task: task.clone(),
            entries,
            total_size: used,
            budget,
            exclusions,
            notes: Vec::new(),
            index_complete: index.is_complete(),
            created_at: Utc::now(),
        };

        tracing::info!(
            profile = %profile.id,
            high = profile.entries_in(Tier::High).count(),
            medium = profile.entries_in(Tier::Medium).count(),
            low = profile.entries_in(Tier::Low).count(),
            excluded = profile.exclusions.len(),
            used,
            budget,
            "packed context profile"
        );
        profile
    }
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(PackingConfig::default())
    }
}

/// Richest form of `artifact` fitting in `remaining` tokens
fn place(
    artifact: &Artifact,
    remaining: usize,
    compressor: &dyn Compressor,
) -> Option<(Tier, usize, EntryContent)> {
    if artifact.size <= remaining {
        return Some((
            Tier::High,
            artifact.size,
            EntryContent::Full(artifact.content.clone()),
        ));
    }

    if let Some(compressed) = compressor
        .compress(artifact)
        .filter(|c| c.size < artifact.size && c.size <= remaining)
    {
        return Some((
            Tier::Medium,
            compressed.size,
            EntryContent::Compressed(compressed.content),
        ));
    }

    let reference = estimate_reference_tokens(&artifact.path);
    (reference <= remaining).then_some((Tier::Low, reference, EntryContent::Reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use crate::model::LearningModel;
    use crate::scorer::Scorer;
    use crate::types::ArtifactKind;
    use std::collections::BTreeMap;

    /// Keeps the first half of the content
    struct Halve;

    impl Compressor for Halve {
        fn compress(&self, artifact: &Artifact) -> Option<Compressed> {
            let half: String = artifact.content.chars().take(artifact.content.len() / 2).collect();
            Some(Compressed {
                content: half,
                size: artifact.size / 2,
            })
        }
    }

    fn sized(path: &str, kind: ArtifactKind, size: usize, imports: &[&str]) -> Artifact {
        let mut a = Artifact::new(path, kind, "x".repeat(size * 3), Utc::now());
        a.size = size;
        a.imports = imports.iter().map(|s| s.to_string()).collect();
        a
    }

    fn scenario_a() -> CodebaseIndex {
        CodebaseIndex::new(
            "/repo",
            vec![
                sized("core.entry", ArtifactKind::EntryPoint, 500, &["util.helper"]),
                sized("util.helper", ArtifactKind::Source, 300, &[]),
                sized("notes.doc", ArtifactKind::Doc, 1000, &[]),
            ],
        )
    }

    fn pack(
        index: &CodebaseIndex,
        text: &str,
        budget: usize,
        compressor: &dyn Compressor,
    ) -> ContextProfile {
        let task = TaskDescriptor::new(text, &KeywordClassifier::new());
        let scored = Scorer::default().score(index, &task, &LearningModel::new(), &BTreeMap::new());
        Packer::default().pack(&task, &scored, index, budget, compressor, &BTreeSet::new())
    }

    #[test]
    fn test_scenario_core_entry_bug() {
        let index = scenario_a();
        let profile = pack(&index, "fix bug in core.entry", 700, &Halve);

        assert_eq!(profile.tier_of("core.entry"), Some(Tier::High));
        assert!(matches!(
            profile.tier_of("util.helper"),
            Some(Tier::High) | Some(Tier::Medium)
        ));
        assert!(matches!(
            profile.tier_of("notes.doc"),
            Some(Tier::Low) | Some(Tier::Excluded)
        ));
        assert!(profile.total_size <= 700);
        assert_eq!(profile.entries[0].path, "core.entry");
    }

    #[test]
    fn test_budget_never_exceeded() {
        let index = scenario_a();
        for budget in [0, 1, 2, 5, 50, 299, 300, 499, 500, 800, 1799, 1800, 5000] {
            let profile = pack(&index, "fix bug in core.entry", budget, &Halve);
            let summed: usize = profile.entries.iter().map(|e| e.size).sum();
            assert_eq!(summed, profile.total_size);
            assert!(profile.total_size <= budget, "budget {budget}");
        }
    }

    #[test]
    fn test_everything_fits_is_high() {
        let index = scenario_a();
        let profile = pack(&index, "fix bug in core.entry", 10_000, &NoCompression);
        assert!(profile.entries.iter().all(|e| e.tier == Tier::High));
        assert_eq!(profile.total_size, 1800);
        assert!(profile.exclusions.is_empty());
    }

    #[test]
    fn test_no_compression_falls_to_reference() {
        let index = scenario_a();
        let profile = pack(&index, "fix bug in core.entry", 700, &NoCompression);
        assert_eq!(profile.tier_of("util.helper"), Some(Tier::Low));
        let entry = profile.entry("util.helper").unwrap();
        assert_eq!(entry.content, EntryContent::Reference);
        assert_eq!(entry.size, estimate_reference_tokens("util.helper"));
    }

    #[test]
    fn test_zero_budget_excludes_everything() {
        let index = scenario_a();
        let profile = pack(&index, "fix bug in core.entry", 0, &Halve);
        assert_eq!(profile.total_size, 0);
        assert!(profile.entries.iter().all(|e| e.tier == Tier::Excluded));
        assert!(profile.exclusions.iter().any(|x| matches!(
            x.reason,
            ExclusionReason::BudgetExhausted { remaining: 0, .. }
        )));
    }

    #[test]
    fn test_below_relevance_excluded() {
        let index = scenario_a();
        let task = TaskDescriptor::new("fix bug in core.entry", &KeywordClassifier::new());
        let mut scored =
            Scorer::default().score(&index, &task, &LearningModel::new(), &BTreeMap::new());
        for s in scored.iter_mut().filter(|s| s.path == "notes.doc") {
            s.score = 0.01;
        }
        let profile =
            Packer::default().pack(&task, &scored, &index, 10_000, &NoCompression, &BTreeSet::new());
        assert_eq!(profile.tier_of("notes.doc"), Some(Tier::Excluded));
        assert!(matches!(
            profile.exclusions[0].reason,
            ExclusionReason::BelowRelevance { .. }
        ));
    }

    #[test]
    fn test_preferred_admitted_first() {
        let index = scenario_a();
        let task = TaskDescriptor::new("fix bug in core.entry", &KeywordClassifier::new());
        let scored = Scorer::default().score(&index, &task, &LearningModel::new(), &BTreeMap::new());
        let preferred: BTreeSet<String> = ["notes.doc".to_string()].into();
        let profile =
            Packer::default().pack(&task, &scored, &index, 1000, &NoCompression, &preferred);
        assert_eq!(profile.entries[0].path, "notes.doc");
        assert_eq!(profile.tier_of("notes.doc"), Some(Tier::High));
        assert_ne!(profile.tier_of("core.entry"), Some(Tier::High));
    }

    #[test]
    fn test_pack_deterministic() {
        let index = scenario_a();
        let a = pack(&index, "fix bug in core.entry", 700, &Halve);
        let b = pack(&index, "fix bug in core.entry", 700, &Halve);
        assert_eq!(a.entries, b.entries);
        assert_eq!(a.exclusions, b.exclusions);
        assert_eq!(a.total_size, b.total_size);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_compressed_form_must_be_smaller() {
        struct Inflate;
        impl Compressor for Inflate {
            fn compress(&self, artifact: &Artifact) -> Option<Compressed> {
                Some(Compressed {
                    content: artifact.content.clone(),
                    size: artifact.size,
                })
            }
        }
        let index = scenario_a();
        let profile = pack(&index, "fix bug in core.entry", 700, &Inflate);
        assert_eq!(profile.entries_in(Tier::Medium).count(), 0);
    }
}
