//! What the learner observes about a finished session

use ctxpack_core::ContextProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Abandoned,
}

impl Outcome {
    /// How much an observation with this outcome is trusted
    pub fn confidence(self) -> f64 {
        match self {
            Outcome::Completed => 1.0,
            Outcome::Abandoned => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Abandoned => "abandoned",
        }
    }
}

/// The profile a session was served together with what it actually used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub profile: ContextProfile,
    pub accessed: BTreeSet<String>,
    pub outcome: Outcome,
    /// User rating, 1 (useless) to 5 (ideal)
    pub rating: Option<u8>,
}

impl SessionLog {
    pub fn new(profile: ContextProfile, accessed: impl IntoIterator<Item = String>) -> Self {
        Self {
            profile,
            accessed: accessed.into_iter().collect(),
            outcome: Outcome::Completed,
            rating: None,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Outcome confidence scaled by the rating; an unrated session counts fully
    pub fn signal_strength(&self) -> f64 {
        let rating = self
            .rating
            .map(|r| f64::from(r.clamp(1, 5)) / 5.0)
            .unwrap_or(1.0);
        self.outcome.confidence() * rating
    }
}
