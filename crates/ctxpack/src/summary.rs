//! Human-readable profile summary handed to the assistant layer

use ctxpack_core::{ContextProfile, Tier};
use ctxpack_session::ResumeNotes;
use std::fmt::Write;

const LISTED_EXCLUSIONS: usize = 5;

/// Render `profile` as a plain-text block, with resume notes when the profile
/// was just restored from a snapshot
pub fn render_summary(profile: &ContextProfile, resume: Option<&ResumeNotes>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Context for: {} ({})",
        profile.task.text,
        profile.task.task_type.as_str()
    );
    let _ = writeln!(
        out,
        "Budget: {} of {} tokens ({:.0}%)",
        profile.total_size,
        profile.budget,
        profile.utilization() * 100.0
    );
    if !profile.index_complete {
        let _ = writeln!(out, "Warning: built from a partial index");
    }

    for (tier, label) in [
        (Tier::High, "Full"),
        (Tier::Medium, "Compressed"),
        (Tier::Low, "Referenced"),
    ] {
        let entries: Vec<_> = profile.entries_in(tier).collect();
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({}):", label, entries.len());
        for entry in entries {
            let _ = writeln!(
                out,
                "  {} [score {:.2}, {} tokens]",
                entry.path, entry.score, entry.size
            );
        }
    }

    if !profile.exclusions.is_empty() {
        let _ = writeln!(out, "\nExcluded ({}):", profile.exclusions.len());
        for exclusion in profile.exclusions.iter().take(LISTED_EXCLUSIONS) {
            let _ = writeln!(out, "  {}: {}", exclusion.path, exclusion.reason);
        }
        if profile.exclusions.len() > LISTED_EXCLUSIONS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                profile.exclusions.len() - LISTED_EXCLUSIONS
            );
        }
    }

    if !profile.notes.is_empty() {
        let _ = writeln!(out, "\nNotes:");
        for note in &profile.notes {
            let _ = writeln!(out, "  - {}", note);
        }
    }

    if let Some(notes) = resume.filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "\nResuming:");
        for (label, items) in [
            ("Progress", &notes.progress),
            ("Next steps", &notes.next_steps),
            ("Open questions", &notes.open_questions),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}:", label);
            for item in items {
                let _ = writeln!(out, "    - {}", item);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxpack_core::{
        EntryContent, Exclusion, ExclusionReason, FeatureVector, KeywordClassifier, ProfileEntry,
        TaskDescriptor,
    };

    fn profile() -> ContextProfile {
        let entry = |path: &str, tier: Tier, size: usize| ProfileEntry {
            path: path.to_string(),
            tier,
            score: 0.75,
            features: FeatureVector::default(),
            size,
            content: EntryContent::Reference,
        };
        ContextProfile {
            id: "p".to_string(),
            task: TaskDescriptor::new("fix bug in core.entry", &KeywordClassifier::new()),
            entries: vec![
                entry("core.entry", Tier::High, 60),
                entry("util.helper", Tier::Medium, 25),
                entry("notes.doc", Tier::Low, 4),
            ],
            total_size: 89,
            budget: 100,
            exclusions: vec![Exclusion {
                path: "big.blob".to_string(),
                reason: ExclusionReason::BudgetExhausted {
                    needed: 5,
                    remaining: 1,
                },
            }],
            notes: vec!["carried over from the previous task: core.entry".to_string()],
            index_complete: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_sections() {
        let text = render_summary(&profile(), None);
        assert!(text.starts_with("Context for: fix bug in core.entry (debugging)"));
        assert!(text.contains("Budget: 89 of 100 tokens (89%)"));
        assert!(text.contains("Full (1):\n  core.entry [score 0.75, 60 tokens]"));
        assert!(text.contains("Compressed (1):"));
        assert!(text.contains("Referenced (1):"));
        assert!(text.contains("big.blob: budget exhausted (5 tokens needed, 1 remaining)"));
        assert!(text.contains("  - carried over from the previous task: core.entry"));
        assert!(!text.contains("Resuming"));
    }

    #[test]
    fn test_resume_notes_rendered() {
        let notes = ResumeNotes {
            next_steps: vec!["continue in core.entry".to_string()],
            ..ResumeNotes::new()
        };
        let text = render_summary(&profile(), Some(&notes));
        assert!(text.contains("Resuming:\n  Next steps:\n    - continue in core.entry"));
        assert!(!text.contains("Open questions"));
    }
}
