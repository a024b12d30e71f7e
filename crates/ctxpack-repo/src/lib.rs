//! Codebase indexing: reference extraction, resolution and layout detection

mod indexer;
mod kind;
mod patterns;
mod resolve;
mod source;
mod symbols;

pub use indexer::{importance, Indexer};
pub use kind::infer_kind;
pub use patterns::{detect_patterns, MIN_PATTERN_CONFIDENCE};
pub use resolve::Resolver;
pub use source::{FsSource, Listing, MemorySource, RepoSource, SourceEntry};
pub use symbols::{extract_symbols, extract_with, FileSymbols, Language, Symbol, SymbolKind};
