//! Session history record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One finished session, appended to `sessions.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub task: String,
    pub task_type: String,
    pub budget: usize,
    pub used_tokens: usize,
    #[serde(default)]
    pub files_included: Vec<String>,
    #[serde(default)]
    pub files_accessed: Vec<String>,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub model_version: Option<u64>,
}
