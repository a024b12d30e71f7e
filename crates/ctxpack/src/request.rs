use ctxpack_session::ResumeNotes;

/// One request for context
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    /// Natural-language task description
    pub task: String,
    /// Files the caller currently has open
    pub current_files: Vec<String>,
    /// Token budget; the configured default when unset
    pub budget: Option<usize>,
    /// Restore this snapshot instead of building a new profile
    pub resume: Option<String>,
    /// Suspend the session's ACTIVE profile rather than discarding it
    pub preserve_current: bool,
    /// Resume notes to store with the suspended profile
    pub notes: ResumeNotes,
}

impl ContextRequest {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            preserve_current: true,
            ..Self::default()
        }
    }

    /// Restore a suspended snapshot
    pub fn resume(snapshot_id: impl Into<String>) -> Self {
        Self {
            resume: Some(snapshot_id.into()),
            ..Self::default()
        }
    }

    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_current_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.current_files = files.into_iter().collect();
        self
    }

    pub fn with_notes(mut self, notes: ResumeNotes) -> Self {
        self.notes = notes;
        self
    }

    /// Discard the ACTIVE profile instead of suspending it
    pub fn discarding_current(mut self) -> Self {
        self.preserve_current = false;
        self
    }
}
