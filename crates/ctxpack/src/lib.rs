//! Context retrieval and budget packing for coding assistants.
//!
//! [`ContextEngine`] ties the pieces together: it indexes a repository,
//! builds a tiered [`ContextProfile`] for each task under a token budget,
//! suspends and resumes profiles per session, and learns from what each
//! session actually used.

mod config;
mod engine;
mod request;
mod summary;

pub use config::EngineConfig;
pub use engine::{ContextEngine, Resumed};
pub use request::ContextRequest;
pub use summary::render_summary;

pub use ctxpack_core::{
    CodebaseIndex, Completeness, ContextProfile, Error, KeywordClassifier, LearningModel,
    Result, TaskClassifier, TaskType, Tier,
};
pub use ctxpack_learn::{LearnerWorker, Outcome};
pub use ctxpack_repo::{FsSource, MemorySource, RepoSource};
pub use ctxpack_session::{ResumeNotes, Snapshot, Switched};
pub use ctxpack_telemetry::{Paths, SessionRecord};
pub use tokio_util::sync::CancellationToken;
