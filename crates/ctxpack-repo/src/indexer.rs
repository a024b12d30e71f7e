//! Codebase indexing: enumerate, read, extract, resolve, rank

use crate::kind::infer_kind;
use crate::patterns::detect_patterns;
use crate::resolve::Resolver;
use crate::source::{RepoSource, SourceEntry};
use crate::symbols::{extract_symbols, FileSymbols};
use chrono::{DateTime, Duration, Utc};
use ctxpack_core::{
    Artifact, ArtifactKind, CodebaseIndex, Completeness, Error, IndexingConfig, PartialReason,
    Result, ScanWarning,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Size in tokens at which the size contribution to importance saturates
const IMPORTANCE_SIZE_SCALE: f64 = 10_000.0;
const RECENT_DAYS: i64 = 7;

/// One read file awaiting reference resolution
struct Loaded {
    path: String,
    kind: ArtifactKind,
    content: String,
    modified: DateTime<Utc>,
    symbols: Option<FileSymbols>,
}

enum Outcome {
    Loaded(Loaded),
    Skipped(ScanWarning),
}

/// Structural importance of an artifact in [0,1]
pub fn importance(artifact: &Artifact, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;
    match artifact.kind {
        ArtifactKind::EntryPoint => score += 0.4,
        ArtifactKind::Config => score += 0.3,
        _ => {}
    }
    score += (artifact.imported_by.len() as f64 * 0.1).min(0.3);
    if now - artifact.modified <= Duration::days(RECENT_DAYS) {
        score += 0.1;
    }
    score += (artifact.size as f64 / IMPORTANCE_SIZE_SCALE).min(0.2);
    score.clamp(0.0, 1.0)
}

pub struct Indexer {
    config: IndexingConfig,
}

impl Indexer {
    pub fn new(config: IndexingConfig) -> Self {
        Self { config }
    }

    /// Build an index of everything `source` lists.
    ///
    /// Per-file failures become warnings. The scan stops between files when
    /// `cancel` fires or the configured timeout elapses, yielding a partial
    /// index over what was read. Only an unreadable root is an error.
    pub fn scan(&self, source: &dyn RepoSource, cancel: &CancellationToken) -> Result<CodebaseIndex> {
        let started = Instant::now();
        let listing = source
            .list(&self.config.ignore_dirs)
            .map_err(|e| Error::RootUnreadable {
                root: source.root().to_path_buf(),
                source: e,
            })?;
        let total = listing.entries.len();
        let mut warnings = listing.warnings;

        let (outcomes, stopped) = self.read_all(source, &listing.entries, cancel, started);
        let scanned = outcomes.len();

        let mut loaded = Vec::with_capacity(scanned);
        for outcome in outcomes {
            match outcome {
                Outcome::Loaded(file) => loaded.push(file),
                Outcome::Skipped(warning) => {
                    tracing::warn!(path = %warning.path, reason = %warning.message, "skipped artifact");
                    warnings.push(warning);
                }
            }
        }

        let now = Utc::now();
        let artifacts = link(loaded, now);
        let patterns = detect_patterns(artifacts.iter().map(|a| a.path.as_str()));

        let completeness = match stopped {
            None => Completeness::Complete,
            Some(reason) => {
                tracing::warn!(?reason, scanned, total, "indexing stopped early");
                Completeness::Partial {
                    reason,
                    scanned,
                    total,
                }
            }
        };

        let index = CodebaseIndex::new(source.root(), artifacts)
            .with_warnings(warnings)
            .with_patterns(patterns)
            .with_completeness(completeness)
            .with_built_at(now);

        tracing::info!(
            root = %source.root().display(),
            artifacts = index.len(),
            edges = index.graph().edge_count(),
            cycles = index.cycles().len(),
            warnings = index.warnings().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexed codebase"
        );
        Ok(index)
    }

    /// Read entries on scoped workers pulling from a shared cursor.
    /// Returns outcomes in listing order and why the scan stopped, if it did.
    fn read_all(
        &self,
        source: &dyn RepoSource,
        entries: &[SourceEntry],
        cancel: &CancellationToken,
        started: Instant,
    ) -> (Vec<Outcome>, Option<PartialReason>) {
        let deadline = started + self.config.timeout();
        let cursor = AtomicUsize::new(0);
        let stop: OnceLock<PartialReason> = OnceLock::new();
        let results: Mutex<Vec<(usize, Outcome)>> = Mutex::new(Vec::with_capacity(entries.len()));
        let workers = self.config.workers.clamp(1, entries.len().max(1));

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        if stop.get().is_some() {
                            break;
                        }
                        if cancel.is_cancelled() {
                            let _ = stop.set(PartialReason::Cancelled);
                            break;
                        }
                        if Instant::now() >= deadline {
                            let _ = stop.set(PartialReason::TimedOut);
                            break;
                        }
                        let i = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(entry) = entries.get(i) else {
                            break;
                        };
                        local.push((i, self.read_one(source, entry)));
                    }
                    if let Ok(mut all) = results.lock() {
                        all.extend(local);
                    }
                });
            }
        });

        let mut results = results.into_inner().unwrap_or_else(|e| e.into_inner());
        results.sort_by_key(|(i, _)| *i);
        (
            results.into_iter().map(|(_, o)| o).collect(),
            stop.into_inner(),
        )
    }

    fn read_one(&self, source: &dyn RepoSource, entry: &SourceEntry) -> Outcome {
        let skip = |message: String| {
            Outcome::Skipped(ScanWarning {
                path: entry.path.clone(),
                message,
            })
        };

        if entry.len > self.config.max_file_bytes {
            return skip(format!(
                "{} bytes exceeds limit of {}",
                entry.len, self.config.max_file_bytes
            ));
        }
        let bytes = match source.read(&entry.path) {
            Ok(bytes) => bytes,
            Err(e) => return skip(format!("unreadable: {}", e)),
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => return skip("not valid UTF-8".to_string()),
        };

        tracing::trace!(path = %entry.path, "read artifact");
        Outcome::Loaded(Loaded {
            kind: infer_kind(&entry.path),
            symbols: extract_symbols(&content, &entry.path),
            path: entry.path.clone(),
            content,
            modified: entry.modified,
        })
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(IndexingConfig::default())
    }
}

/// Resolve references into import edges and compute importance
fn link(loaded: Vec<Loaded>, now: DateTime<Utc>) -> Vec<Artifact> {
    let resolver = Resolver::new(loaded.iter().map(|f| f.path.as_str()));

    let mut artifacts: Vec<Artifact> = loaded
        .into_iter()
        .map(|file| {
            let mut artifact = Artifact::new(file.path, file.kind, file.content, file.modified);
            if let Some(symbols) = file.symbols {
                let imports: BTreeSet<String> = symbols
                    .references
                    .iter()
                    .filter_map(|r| resolver.resolve(&artifact.path, symbols.language, r))
                    .collect();
                artifact.imports = imports.into_iter().collect();
                artifact.signatures = symbols.signatures();
            }
            artifact
        })
        .collect();

    let mut importers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for artifact in &artifacts {
        for target in &artifact.imports {
            importers
                .entry(target.clone())
                .or_default()
                .push(artifact.path.clone());
        }
    }
    for artifact in &mut artifacts {
        artifact.imported_by = importers.remove(&artifact.path).unwrap_or_default();
        artifact.importance = importance(artifact, now);
    }
    artifacts
}
