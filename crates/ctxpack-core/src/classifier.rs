//! Task classification strategies

use crate::types::TaskType;

/// Maps free task text to a [`TaskType`].
///
/// The scorer only sees the resulting enum, so classifiers can be swapped
/// without touching scoring.
pub trait TaskClassifier: Send + Sync {
    fn classify(&self, text: &str) -> TaskType;
}

struct TaskKeywords {
    task_type: TaskType,
    keywords: &'static [&'static str],
}

const TASK_KEYWORD_MAP: &[TaskKeywords] = &[
    TaskKeywords {
        task_type: TaskType::Debugging,
        keywords: &["bug", "fix", "error"],
    },
    TaskKeywords {
        task_type: TaskType::Feature,
        keywords: &["feature", "add", "implement"],
    },
    TaskKeywords {
        task_type: TaskType::Refactor,
        keywords: &["refactor", "optimize", "improve"],
    },
    TaskKeywords {
        task_type: TaskType::Testing,
        keywords: &["test", "spec"],
    },
    TaskKeywords {
        task_type: TaskType::Documentation,
        keywords: &["document", "readme"],
    },
];

/// Keyword taxonomy classifier.
///
/// The type with the most keyword hits wins; ties go to the earlier table
/// entry; no hits means [`TaskType::General`].
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl TaskClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> TaskType {
        let lower = text.to_lowercase();
        let mut best: Option<(TaskType, usize)> = None;

        for entry in TASK_KEYWORD_MAP {
            let hits = entry
                .keywords
                .iter()
                .filter(|kw| lower.contains(*kw))
                .count();
            let better = match best {
                Some((_, best_hits)) => hits > best_hits,
                None => hits > 0,
            };
            if better {
                best = Some((entry.task_type, hits));
            }
        }

        best.map(|(t, _)| t).unwrap_or(TaskType::General)
    }
}
