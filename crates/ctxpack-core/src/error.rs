//! Error taxonomy for context delivery

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to callers.
///
/// Per-artifact problems (unreadable files, budget overflow, dependency
/// cycles) are recorded on the index or profile instead of being raised.
#[derive(Debug, Error)]
pub enum Error {
    /// The repository root itself could not be enumerated
    #[error("cannot enumerate repository root {}: {source}", root.display())]
    RootUnreadable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("learning model corrupted: {0}")]
    ModelCorruption(String),

    #[error("no codebase index has been built")]
    NoIndex,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("learner worker has stopped")]
    LearnerStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
