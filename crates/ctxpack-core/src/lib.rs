//! Core context model, relevance scoring and budget packing

mod classifier;
mod config;
mod error;
mod graph;
mod index;
mod model;
mod packer;
mod scorer;
pub mod text;
mod types;

pub use classifier::{KeywordClassifier, TaskClassifier};
pub use config::{Config, IndexingConfig, LearningConfig, PackingConfig, ScoringConfig};
pub use error::{Error, Result};
pub use graph::{Cycle, DependencyGraph};
pub use index::{ArchitecturalPattern, CodebaseIndex, Completeness, PartialReason};
pub use model::{AffinityTable, FeatureWeights, LearningModel};
pub use packer::{Compressed, Compressor, NoCompression, Packer};
pub use scorer::{rank_order, ScoredArtifact, Scorer};
pub use types::{
    Artifact, ArtifactKind, ContextProfile, EntryContent, Exclusion, ExclusionReason, Feature,
    FeatureVector, ProfileEntry, ScanWarning, TaskDescriptor, TaskType, Tier,
};
