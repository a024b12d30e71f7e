use chrono::{DateTime, Utc};
use ctxpack_core::{ContextProfile, ExclusionReason, Tier};
use serde::{Deserialize, Serialize};

const NOTED_PATHS: usize = 3;

/// Hints for picking a suspended task back up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeNotes {
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub progress: Vec<String>,
}

impl ResumeNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes derived from what the profile holds and what it had to leave out
    pub fn for_profile(profile: &ContextProfile) -> Self {
        let included = profile.included_paths();
        let mut notes = ResumeNotes::new();

        notes.progress.push(format!("working on: {}", profile.task.text));
        notes.progress.push(format!(
            "{} artifacts in context, {} of {} tokens used",
            included.len(),
            profile.total_size,
            profile.budget
        ));

        notes.next_steps.extend(
            profile
                .entries_in(Tier::High)
                .take(NOTED_PATHS)
                .map(|e| format!("continue in {}", e.path)),
        );

        notes.open_questions.extend(
            profile
                .exclusions
                .iter()
                .filter(|x| matches!(x.reason, ExclusionReason::BudgetExhausted { .. }))
                .take(NOTED_PATHS)
                .map(|x| format!("{} did not fit the budget", x.path)),
        );
        if !profile.index_complete {
            notes
                .open_questions
                .push("context was built from a partial index".to_string());
        }
        notes
    }

    /// Append `other`'s notes that are not already present
    pub fn merge(mut self, other: ResumeNotes) -> Self {
        fn extend(into: &mut Vec<String>, from: Vec<String>) {
            for note in from {
                if !into.contains(&note) {
                    into.push(note);
                }
            }
        }
        extend(&mut self.open_questions, other.open_questions);
        extend(&mut self.next_steps, other.next_steps);
        extend(&mut self.progress, other.progress);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.open_questions.is_empty() && self.next_steps.is_empty() && self.progress.is_empty()
    }
}

/// A suspended context profile.
///
/// Snapshots are immutable once captured: fields are only readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    id: String,
    session_id: String,
    profile: ContextProfile,
    notes: ResumeNotes,
    created_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn capture(session_id: &str, profile: ContextProfile, notes: ResumeNotes) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            notes: ResumeNotes::for_profile(&profile).merge(notes),
            profile,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn profile(&self) -> &ContextProfile {
        &self.profile
    }

    pub fn notes(&self) -> &ResumeNotes {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
