//! The engine: index, build, switch, resume and learn

use crate::config::EngineConfig;
use crate::request::ContextRequest;
use crate::summary::render_summary;
use ctxpack_compress::SignatureCompressor;
use ctxpack_core::{
    CodebaseIndex, ContextProfile, Error, KeywordClassifier, LearningModel, Result,
    TaskClassifier, TaskDescriptor,
};
use ctxpack_learn::{
    FeedbackLearner, LearnerWorker, LearningTarget, ModelHandle, ModelStore, Outcome, SessionLog,
};
use ctxpack_repo::{Indexer, RepoSource};
use ctxpack_session::{Annotator, ContextSwitcher, Snapshot, SnapshotDb, SwitchRequest, Switched};
use ctxpack_telemetry::{append_jsonl, read_jsonl, Paths, SessionRecord};
use ctxpack_triggers::{Event, TriggerAction, TriggerTable};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// A restored snapshot together with the notes its restoration produced
#[derive(Debug, Clone)]
pub struct Resumed {
    pub snapshot: Snapshot,
    pub notes: Vec<String>,
}

impl Resumed {
    pub fn profile(&self) -> &ContextProfile {
        self.snapshot.profile()
    }

    pub fn summary(&self) -> String {
        let profile = self.snapshot.profile().clone().with_notes(self.notes.clone());
        render_summary(&profile, Some(self.snapshot.notes()))
    }
}

/// State bound to one indexed repository
struct Project {
    root: PathBuf,
    index: Arc<CodebaseIndex>,
    state: Arc<ProjectState>,
}

/// What survives re-indexing the same root
struct ProjectState {
    switcher: ContextSwitcher,
    learning: LearningTarget,
    history: Option<PathBuf>,
}

pub struct ContextEngine {
    config: EngineConfig,
    paths: Option<Paths>,
    classifier: Box<dyn TaskClassifier>,
    indexer: Indexer,
    learner: FeedbackLearner,
    triggers: Arc<TriggerTable>,
    reindex: Arc<AtomicBool>,
    project: RwLock<Option<Arc<Project>>>,
    worker: Mutex<Option<LearnerWorker>>,
}

impl ContextEngine {
    /// An engine that keeps all state in memory
    pub fn new(config: EngineConfig) -> Self {
        Self {
            paths: None,
            classifier: Box::new(KeywordClassifier::new()),
            indexer: Indexer::new(config.core.indexing.clone()),
            learner: FeedbackLearner::new(config.core.learning.clone()),
            triggers: Arc::new(TriggerTable::with_defaults(&config.triggers)),
            reindex: Arc::new(AtomicBool::new(false)),
            project: RwLock::new(None),
            worker: Mutex::new(None),
            config,
        }
    }

    /// An engine persisting snapshots, the learning model and session history
    /// under `paths`
    pub fn with_paths(config: EngineConfig, paths: Paths) -> Self {
        let mut engine = Self::new(config);
        engine.paths = Some(paths);
        engine
    }

    /// Persisting engine configured from `config.json` under `paths`
    pub fn from_paths(paths: Paths) -> anyhow::Result<Self> {
        let config = EngineConfig::load(&paths)?;
        Ok(Self::with_paths(config, paths))
    }

    pub fn with_classifier(mut self, classifier: Box<dyn TaskClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self, source: &dyn RepoSource) -> Result<Arc<CodebaseIndex>> {
        self.index_with_cancel(source, &CancellationToken::new())
    }

    /// Rebuild the index from `source`.
    ///
    /// Re-indexing the same root keeps its sessions; a new root switches the
    /// engine to that project's stored state.
    pub fn index_with_cancel(
        &self,
        source: &dyn RepoSource,
        cancel: &CancellationToken,
    ) -> Result<Arc<CodebaseIndex>> {
        let scanned = self.indexer.scan(source, cancel)?;
        let root = scanned.root().to_path_buf();

        let mut slot = self.project.write().unwrap_or_else(PoisonError::into_inner);
        let state = match slot.as_ref().filter(|p| p.root == root) {
            Some(current) => Arc::clone(&current.state),
            None => Arc::new(self.open_project(&root)),
        };

        let model = state.learning.model.snapshot();
        let index = Arc::new(scanned.with_access_counts(&model.access_counts));
        for note in self.triggers.notes(&Event::IndexBuilt { index: &index }) {
            tracing::info!(root = %root.display(), "{}", note);
        }
        self.reindex.store(false, Ordering::Relaxed);

        *slot = Some(Arc::new(Project {
            root,
            index: Arc::clone(&index),
            state,
        }));
        Ok(index)
    }

    /// Fresh state for a root the engine has not indexed yet. Every project
    /// learns into its own model; a stored one is picked up when persisting.
    fn open_project(&self, root: &Path) -> ProjectState {
        let mut switcher =
            ContextSwitcher::new(&self.config.core, Arc::new(SignatureCompressor::new()))
                .with_annotator(self.annotator());
        let Some(paths) = &self.paths else {
            tracing::debug!(root = %root.display(), "project opened in memory");
            return ProjectState {
                switcher,
                learning: LearningTarget::new(ModelHandle::new(self.fresh_model()), None),
                history: None,
            };
        };

        match SnapshotDb::new(&paths.snapshots_db(root)) {
            Ok(db) => switcher = switcher.with_store(db),
            Err(e) => tracing::warn!(error = %e, "snapshots will not be persisted"),
        }

        let store = ModelStore::new(paths.model_file(root));
        let model = store.load_or_else(|| self.fresh_model());
        tracing::debug!(root = %root.display(), version = model.version, "project opened");

        ProjectState {
            switcher,
            learning: LearningTarget::new(ModelHandle::new(model), Some(store)),
            history: Some(paths.history_file(root)),
        }
    }

    fn fresh_model(&self) -> LearningModel {
        let mut fresh = LearningModel::new();
        fresh.weights = self.config.core.initial_weights.normalized();
        fresh
    }

    fn annotator(&self) -> Annotator {
        let triggers = Arc::clone(&self.triggers);
        let reindex = Arc::clone(&self.reindex);
        Box::new(move |switched: &Switched, index: &CodebaseIndex| {
            let events = [
                Event::IndexBuilt { index },
                Event::ProfileBuilt {
                    profile: &switched.profile,
                },
                Event::Switched {
                    profile: &switched.profile,
                    suspended: switched.suspended.as_deref(),
                    carried_over: &switched.carried_over,
                },
            ];
            let mut notes = Vec::new();
            for event in &events {
                for action in triggers.fire(event) {
                    match action {
                        TriggerAction::Note(note) => notes.push(note),
                        TriggerAction::Reindex => reindex.store(true, Ordering::Relaxed),
                        TriggerAction::ScheduleLearning => {}
                    }
                }
            }
            notes
        })
    }

    fn project(&self) -> Result<Arc<Project>> {
        self.project
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NoIndex)
    }

    pub fn current_index(&self) -> Option<Arc<CodebaseIndex>> {
        self.project().ok().map(|p| Arc::clone(&p.index))
    }

    /// Whether a trigger asked for the index to be rebuilt since the last scan
    pub fn reindex_requested(&self) -> bool {
        self.reindex.load(Ordering::Relaxed)
    }

    /// Profile for `request`: a restored snapshot when it names one,
    /// otherwise a freshly built profile that becomes the session's ACTIVE
    /// one.
    pub fn build(&self, session_id: &str, request: ContextRequest) -> Result<ContextProfile> {
        if let Some(snapshot_id) = &request.resume {
            let resumed = self.resume(session_id, snapshot_id)?;
            return Ok(resumed.snapshot.profile().clone());
        }
        Ok(self.switch_to(session_id, request)?.profile)
    }

    pub fn switch_to(&self, session_id: &str, request: ContextRequest) -> Result<Switched> {
        let project = self.project()?;
        let model = project.state.learning.model.snapshot();
        let switch = SwitchRequest {
            task: TaskDescriptor::new(request.task, &*self.classifier),
            budget: request.budget.unwrap_or(self.config.core.packing.budget),
            preserve_current: request.preserve_current,
            notes: request.notes,
            current_files: request.current_files,
        };
        project
            .state
            .switcher
            .switch_to(session_id, switch, &project.index, &model)
    }

    pub fn resume(&self, session_id: &str, snapshot_id: &str) -> Result<Resumed> {
        let project = self.project()?;
        let snapshot = project.state.switcher.resume(session_id, snapshot_id)?;
        let notes = self.triggers.notes(&Event::Resumed {
            profile: snapshot.profile(),
            snapshot_id,
        });
        Ok(Resumed { snapshot, notes })
    }

    pub fn active(&self, session_id: &str) -> Option<ContextProfile> {
        self.project().ok()?.state.switcher.active(session_id)
    }

    pub fn depth(&self, session_id: &str) -> usize {
        self.project()
            .map(|p| p.state.switcher.depth(session_id))
            .unwrap_or(0)
    }

    /// Suspended snapshots of a session, most recent first
    pub fn snapshots(&self, session_id: &str) -> Vec<Snapshot> {
        self.project()
            .map(|p| p.state.switcher.snapshots(session_id))
            .unwrap_or_default()
    }

    /// Close a session and hand what it used to the learner.
    ///
    /// Learning runs on the background worker when one is started, inline
    /// otherwise; the returned record carries the committed model version in
    /// the inline case. `None` when the session had no ACTIVE profile.
    pub fn finish_session(
        &self,
        session_id: &str,
        accessed: impl IntoIterator<Item = String>,
        outcome: Outcome,
        rating: Option<u8>,
    ) -> Result<Option<SessionRecord>> {
        let project = self.project()?;
        let Some(profile) = project.state.switcher.end_session(session_id) else {
            tracing::debug!(session = session_id, "nothing to learn from");
            return Ok(None);
        };

        let mut log = SessionLog::new(profile, accessed).with_outcome(outcome);
        if let Some(rating) = rating {
            log = log.with_rating(rating);
        }

        let mut record = SessionRecord {
            session_id: session_id.to_string(),
            project: project.root.display().to_string(),
            timestamp: chrono::Utc::now(),
            task: log.profile.task.text.clone(),
            task_type: log.profile.task.task_type.as_str().to_string(),
            budget: log.profile.budget,
            used_tokens: log.profile.total_size,
            files_included: log.profile.included_paths(),
            files_accessed: log.accessed.iter().cloned().collect(),
            outcome: outcome.as_str().to_string(),
            rating,
            model_version: None,
        };

        let mut learn = false;
        for action in self.triggers.fire(&Event::SessionFinished { record: &record }) {
            match action {
                TriggerAction::Note(note) => tracing::info!(session = session_id, "{}", note),
                TriggerAction::ScheduleLearning => learn = true,
                TriggerAction::Reindex => self.reindex.store(true, Ordering::Relaxed),
            }
        }
        if learn {
            record.model_version = self.schedule_learning(&project, log);
        }

        if let Some(history) = &project.state.history {
            if let Err(e) = append_jsonl(history, &record) {
                tracing::warn!(error = %e, "failed to record session history");
            }
        }
        Ok(Some(record))
    }

    fn schedule_learning(&self, project: &Project, log: SessionLog) -> Option<u64> {
        let target = project.state.learning.clone();
        {
            let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(worker) = worker.as_ref() {
                if let Err(e) = worker.submit(log, target) {
                    tracing::warn!(error = %e, "session log dropped");
                }
                return None;
            }
        }
        Some(target.apply(&self.learner, &log).version)
    }

    /// Learn from finished sessions on a tokio task from now on.
    ///
    /// Each session is learned into the model of the project it ran against,
    /// even when the engine has moved to another root by then. Must be called
    /// from within a tokio runtime.
    pub fn start_background_learning(&self) {
        let worker = LearnerWorker::spawn(self.learner.clone());
        let previous = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(worker);
        if previous.is_some() {
            tracing::debug!("replaced running learner worker");
        }
    }

    /// Wait for queued session logs to be learned and stop the worker
    pub async fn stop_background_learning(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.shutdown().await;
        }
    }

    /// The model scoring currently uses: the current project's, or a fresh
    /// one before anything is indexed
    pub fn model(&self) -> Arc<LearningModel> {
        match self.project() {
            Ok(project) => project.state.learning.model.snapshot(),
            Err(_) => Arc::new(self.fresh_model()),
        }
    }

    pub fn summary(&self, profile: &ContextProfile) -> String {
        render_summary(profile, None)
    }

    /// Recorded sessions of the current project, oldest first
    pub fn history(&self) -> anyhow::Result<Vec<SessionRecord>> {
        let project = self.project()?;
        match &project.state.history {
            Some(path) => Ok(read_jsonl(path)?),
            None => Ok(Vec::new()),
        }
    }
}
