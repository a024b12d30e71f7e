//! Per-session ACTIVE profile and LIFO stack of suspended snapshots

use crate::snapshot::{ResumeNotes, Snapshot};
use crate::store::SnapshotDb;
use ctxpack_core::{
    CodebaseIndex, Compressor, Config, ContextProfile, Error, LearningModel, Packer, Result,
    Scorer, TaskDescriptor,
};
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What to build when switching tasks
#[derive(Debug, Clone)]
pub struct SwitchRequest {
    pub task: TaskDescriptor,
    pub budget: usize,
    /// Snapshot the outgoing profile instead of discarding it
    pub preserve_current: bool,
    /// Added to the generated resume notes of the outgoing profile
    pub notes: ResumeNotes,
    /// Files the caller is looking at; they seed dependency proximity
    pub current_files: Vec<String>,
}

impl SwitchRequest {
    pub fn new(task: TaskDescriptor, budget: usize) -> Self {
        Self {
            task,
            budget,
            preserve_current: true,
            notes: ResumeNotes::new(),
            current_files: Vec::new(),
        }
    }
}

/// Result of a switch
#[derive(Debug, Clone)]
pub struct Switched {
    /// The new ACTIVE profile
    pub profile: ContextProfile,
    /// Id of the snapshot the outgoing profile was suspended into
    pub suspended: Option<String>,
    /// Outgoing artifacts that stayed relevant to the new task
    pub carried_over: Vec<String>,
}

/// Computes notes for a freshly built profile before it becomes ACTIVE
pub type Annotator = Box<dyn Fn(&Switched, &CodebaseIndex) -> Vec<String> + Send + Sync>;

#[derive(Default)]
struct SessionState {
    active: Option<ContextProfile>,
    stack: Vec<Snapshot>,
    loaded: bool,
    /// Set by `end_session` before the entry leaves the map
    ended: bool,
}

/// Builds profiles for sessions and keeps their suspended work resumable.
///
/// Operations on one session are mutually exclusive; different sessions
/// proceed independently. With a [`SnapshotDb`] attached every stack change is
/// written through, and a session's stored state is loaded on first use.
pub struct ContextSwitcher {
    scorer: Scorer,
    packer: Packer,
    compressor: Arc<dyn Compressor>,
    carry_over_threshold: f64,
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
    db: Option<Mutex<SnapshotDb>>,
    annotator: Option<Annotator>,
}

impl ContextSwitcher {
    pub fn new(config: &Config, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            scorer: Scorer::new(config.scoring.clone()),
            packer: Packer::new(config.packing.clone()),
            compressor,
            carry_over_threshold: config.carry_over_threshold,
            sessions: DashMap::new(),
            db: None,
            annotator: None,
        }
    }

    pub fn with_store(mut self, db: SnapshotDb) -> Self {
        self.db = Some(Mutex::new(db));
        self
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Suspend the ACTIVE profile (when asked to) and make a freshly built
    /// profile for `request.task` ACTIVE.
    ///
    /// Included artifacts of the outgoing profile that still score at least
    /// the carry-over threshold against the new task are admitted first.
    pub fn switch_to(
        &self,
        session_id: &str,
        request: SwitchRequest,
        index: &CodebaseIndex,
        model: &LearningModel,
    ) -> Result<Switched> {
        self.with_state(session_id, |state| {
            let outgoing = state.active.take();
            let mut suspended = None;
            if let Some(previous) = &outgoing {
                if request.preserve_current {
                    let snapshot = Snapshot::capture(session_id, previous.clone(), request.notes);
                    tracing::debug!(
                        session = session_id,
                        snapshot = snapshot.id(),
                        depth = state.stack.len() + 1,
                        "suspending profile"
                    );
                    self.persist(|db| db.push(&snapshot));
                    suspended = Some(snapshot.id().to_string());
                    state.stack.push(snapshot);
                }
            }

            let no_seeds = BTreeMap::new();
            let mut seeds: BTreeMap<String, f64> = BTreeMap::new();
            let mut preferred = BTreeSet::new();
            if let Some(previous) = &outgoing {
                for path in previous.included_paths() {
                    let Some(rescored) =
                        self.scorer
                            .score_one(index, &request.task, model, &no_seeds, &path)
                    else {
                        continue;
                    };
                    if rescored.score >= self.carry_over_threshold {
                        seeds.insert(path.clone(), rescored.score);
                        preferred.insert(path);
                    }
                }
            }
            for path in &request.current_files {
                if index.artifact(path).is_some() {
                    seeds.insert(path.clone(), 1.0);
                }
            }

            let scored = self.scorer.score(index, &request.task, model, &seeds);
            let profile = self.packer.pack(
                &request.task,
                &scored,
                index,
                request.budget,
                self.compressor.as_ref(),
                &preferred,
            );

            let mut switched = Switched {
                profile,
                suspended,
                carried_over: preferred.into_iter().collect(),
            };
            if let Some(annotate) = &self.annotator {
                let notes = annotate(&switched, index);
                switched.profile.notes.extend(notes);
            }

            tracing::info!(
                session = session_id,
                profile = %switched.profile.id,
                carried_over = switched.carried_over.len(),
                depth = state.stack.len(),
                "profile active"
            );
            self.persist(|db| db.set_active(session_id, &switched.profile));
            state.active = Some(switched.profile.clone());
            Ok(switched)
        })
    }

    /// Remove a snapshot from the session's stack and make its profile ACTIVE
    /// exactly as it was suspended.
    ///
    /// On [`Error::SnapshotNotFound`] the ACTIVE profile is left untouched.
    pub fn resume(&self, session_id: &str, snapshot_id: &str) -> Result<Snapshot> {
        self.with_state(session_id, |state| {
            let Some(position) = state.stack.iter().position(|s| s.id() == snapshot_id) else {
                tracing::debug!(session = session_id, snapshot = snapshot_id, "snapshot not found");
                return Err(Error::SnapshotNotFound(snapshot_id.to_string()));
            };
            let snapshot = state.stack.remove(position);
            self.persist(|db| db.remove(snapshot.id()).map(|_| ()));
            self.persist(|db| db.set_active(session_id, snapshot.profile()));
            state.active = Some(snapshot.profile().clone());

            tracing::info!(
                session = session_id,
                snapshot = snapshot_id,
                depth = state.stack.len(),
                "resumed"
            );
            Ok(snapshot)
        })
    }

    pub fn active(&self, session_id: &str) -> Option<ContextProfile> {
        self.with_state(session_id, |state| state.active.clone())
    }

    /// Number of suspended snapshots
    pub fn depth(&self, session_id: &str) -> usize {
        self.with_state(session_id, |state| state.stack.len())
    }

    /// Suspended snapshots, most recent first
    pub fn snapshots(&self, session_id: &str) -> Vec<Snapshot> {
        self.with_state(session_id, |state| state.stack.iter().rev().cloned().collect())
    }

    /// Drop a session with its stack; returns its last ACTIVE profile.
    ///
    /// The entry leaves the map while its lock is held and is marked ended, so
    /// a caller already waiting on it starts over on a fresh session.
    pub fn end_session(&self, session_id: &str) -> Option<ContextProfile> {
        let active = self.with_state(session_id, |state| {
            state.ended = true;
            state.stack.clear();
            self.sessions.remove(session_id);
            self.persist(|db| db.clear_session(session_id));
            state.active.take()
        });
        tracing::debug!(session = session_id, had_active = active.is_some(), "session ended");
        active
    }

    /// Run `f` on the live state of a session, loading it on first use
    fn with_state<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        loop {
            let session = self.session(session_id);
            let mut state = lock(&session);
            if state.ended {
                continue;
            }
            self.ensure_loaded(session_id, &mut state);
            return f(&mut state);
        }
    }

    fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn ensure_loaded(&self, session_id: &str, state: &mut SessionState) {
        if state.loaded {
            return;
        }
        state.loaded = true;
        let Some(db) = &self.db else {
            return;
        };
        let db = db.lock().unwrap_or_else(PoisonError::into_inner);
        match db.stack(session_id) {
            Ok(stack) => state.stack = stack,
            Err(e) => tracing::warn!(session = session_id, error = %e, "failed to load stack"),
        }
        match db.active(session_id) {
            Ok(active) => state.active = active,
            Err(e) => tracing::warn!(session = session_id, error = %e, "failed to load profile"),
        }
    }

    fn persist(&self, write: impl FnOnce(&SnapshotDb) -> anyhow::Result<()>) {
        let Some(db) = &self.db else {
            return;
        };
        let db = db.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = write(&db) {
            tracing::warn!(error = %e, "snapshot store write failed");
        }
    }
}

fn lock(session: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxpack_core::{Artifact, ArtifactKind, KeywordClassifier, NoCompression, Tier};
    use std::thread;

    fn index() -> CodebaseIndex {
        let artifact = |path: &str, kind, content: &str, imports: &[&str]| {
            let mut a = Artifact::new(path, kind, content, Utc::now());
            a.imports = imports.iter().map(|s| s.to_string()).collect();
            a
        };
        CodebaseIndex::new(
            "/repo",
            vec![
                artifact(
                    "src/auth.rs",
                    ArtifactKind::Source,
                    "pub fn login(user: &str, password: &str) -> bool { verify_password(user, password) }",
                    &["src/crypto.rs"],
                ),
                artifact(
                    "src/crypto.rs",
                    ArtifactKind::Source,
                    "pub fn verify_password(user: &str, password: &str) -> bool { hash(password) == stored(user) }",
                    &[],
                ),
                artifact(
                    "src/billing.rs",
                    ArtifactKind::Source,
                    "pub fn charge_invoice(invoice: Invoice) { send_payment(invoice.total) }",
                    &[],
                ),
                artifact(
                    "docs/billing.md",
                    ArtifactKind::Doc,
                    "# Billing\n\nInvoices are charged monthly.",
                    &[],
                ),
            ],
        )
    }

    fn request(task: &str) -> SwitchRequest {
        SwitchRequest::new(TaskDescriptor::new(task, &KeywordClassifier::new()), 1000)
    }

    fn switcher() -> ContextSwitcher {
        ContextSwitcher::new(&Config::new(), Arc::new(NoCompression))
    }

    #[test]
    fn test_first_switch_has_nothing_to_suspend() {
        let switcher = switcher();
        let switched = switcher
            .switch_to("s1", request("fix login password bug"), &index(), &LearningModel::new())
            .unwrap();
        assert!(switched.suspended.is_none());
        assert_eq!(switcher.depth("s1"), 0);
        assert_eq!(switcher.active("s1"), Some(switched.profile));
    }

    #[test]
    fn test_stack_is_lifo_and_resume_is_verbatim() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        let tasks = ["fix login bug", "charge invoice feature", "document billing", "refactor crypto"];

        let mut profiles = Vec::new();
        let mut snapshot_ids = Vec::new();
        for task in tasks {
            let switched = switcher.switch_to("s1", request(task), &index, &model).unwrap();
            profiles.push(switched.profile);
            snapshot_ids.extend(switched.suspended);
        }
        assert_eq!(switcher.depth("s1"), tasks.len() - 1);

        let top = snapshot_ids.last().unwrap().clone();
        let resumed = switcher.resume("s1", &top).unwrap();
        assert_eq!(switcher.depth("s1"), tasks.len() - 2);
        assert_eq!(resumed.profile(), &profiles[tasks.len() - 2]);
        assert_eq!(switcher.active("s1").as_ref(), Some(resumed.profile()));

        // resuming from the middle of the stack works too
        let resumed = switcher.resume("s1", &snapshot_ids[0]).unwrap();
        assert_eq!(resumed.profile(), &profiles[0]);
        assert_eq!(switcher.depth("s1"), tasks.len() - 3);
    }

    #[test]
    fn test_missing_snapshot_leaves_active_untouched() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        let before = switcher
            .switch_to("s1", request("fix login bug"), &index, &model)
            .unwrap()
            .profile;

        let err = switcher.resume("s1", "missing-id").unwrap_err();
        assert!(matches!(err, Error::SnapshotNotFound(ref id) if id == "missing-id"));
        assert_eq!(switcher.active("s1"), Some(before));
        assert_eq!(switcher.depth("s1"), 0);
    }

    #[test]
    fn test_carry_over_is_admitted_first() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        switcher
            .switch_to("s1", request("fix login password verify bug"), &index, &model)
            .unwrap();

        let switched = switcher
            .switch_to("s1", request("add password login rate limit"), &index, &model)
            .unwrap();
        assert!(switched.carried_over.contains(&"src/auth.rs".to_string()));
        assert_eq!(switched.profile.entries[0].path, switched.carried_over[0]);
        assert!(!switched.carried_over.contains(&"src/billing.rs".to_string()));
    }

    #[test]
    fn test_without_preserve_nothing_is_pushed() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        switcher.switch_to("s1", request("fix login bug"), &index, &model).unwrap();

        let mut req = request("charge invoice");
        req.preserve_current = false;
        let switched = switcher.switch_to("s1", req, &index, &model).unwrap();
        assert!(switched.suspended.is_none());
        assert_eq!(switcher.depth("s1"), 0);
    }

    #[test]
    fn test_concurrent_switches_serialize() {
        let switcher = Arc::new(switcher());
        let index = Arc::new(index());
        let model = Arc::new(LearningModel::new());
        switcher.switch_to("s1", request("fix login bug"), &index, &model).unwrap();

        let handles: Vec<_> = ["charge invoice", "document billing"]
            .into_iter()
            .map(|task| {
                let (switcher, index, model) = (switcher.clone(), index.clone(), model.clone());
                thread::spawn(move || switcher.switch_to("s1", request(task), &index, &model).unwrap())
            })
            .collect();
        let results: Vec<Switched> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(switcher.depth("s1"), 2);
        let stacked: Vec<String> = switcher
            .snapshots("s1")
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        for switched in &results {
            assert!(stacked.contains(switched.suspended.as_ref().unwrap()));
        }
    }

    #[test]
    fn test_sessions_are_independent() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        switcher.switch_to("a", request("fix login bug"), &index, &model).unwrap();
        switcher.switch_to("a", request("charge invoice"), &index, &model).unwrap();
        switcher.switch_to("b", request("document billing"), &index, &model).unwrap();
        assert_eq!(switcher.depth("a"), 1);
        assert_eq!(switcher.depth("b"), 0);

        let ended = switcher.end_session("a").unwrap();
        assert_eq!(ended.task.text, "charge invoice");
        assert_eq!(switcher.depth("a"), 0);
        assert!(switcher.active("a").is_none());
        assert!(switcher.active("b").is_some());
    }

    #[test]
    fn test_waiter_on_an_ended_session_starts_over() {
        let switcher = switcher();
        let index = index();
        let model = LearningModel::new();
        switcher.switch_to("a", request("fix login bug"), &index, &model).unwrap();

        // a caller that fetched the entry just before the session ended
        let stale = switcher.session("a");
        assert!(switcher.end_session("a").is_some());
        assert!(lock(&stale).ended);

        let switched = switcher.switch_to("a", request("charge invoice"), &index, &model).unwrap();
        assert!(switched.suspended.is_none());
        assert!(!Arc::ptr_eq(&stale, &switcher.session("a")));
        assert_eq!(switcher.active("a"), Some(switched.profile));
    }

    #[test]
    fn test_concurrent_end_and_switch_leave_a_consistent_session() {
        let switcher = Arc::new(switcher());
        let index = Arc::new(index());
        let model = Arc::new(LearningModel::new());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let (switcher, index, model) = (switcher.clone(), index.clone(), model.clone());
                thread::spawn(move || {
                    for _ in 0..10 {
                        if i % 2 == 0 {
                            switcher
                                .switch_to("s1", request("charge invoice"), &index, &model)
                                .unwrap();
                        } else {
                            switcher.end_session("s1");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let last = switcher.switch_to("s1", request("fix login bug"), &index, &model).unwrap();
        assert_eq!(switcher.active("s1"), Some(last.profile));
        assert_eq!(switcher.sessions.len(), 1);
    }

    #[test]
    fn test_annotator_notes_are_part_of_the_active_profile() {
        let switcher = switcher().with_annotator(Box::new(
            |switched: &Switched, index: &CodebaseIndex| {
                vec![format!(
                    "{} carried, {} indexed",
                    switched.carried_over.len(),
                    index.len()
                )]
            },
        ));
        let index = index();
        let model = LearningModel::new();
        let first = switcher
            .switch_to("s1", request("fix login bug"), &index, &model)
            .unwrap();
        assert_eq!(first.profile.notes, vec!["0 carried, 4 indexed"]);

        let second = switcher
            .switch_to("s1", request("charge invoice"), &index, &model)
            .unwrap();
        let resumed = switcher
            .resume("s1", second.suspended.as_deref().unwrap())
            .unwrap();
        assert_eq!(resumed.profile(), &first.profile);
    }

    #[test]
    fn test_store_survives_restart() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("snapshots.db");
        let index = index();
        let model = LearningModel::new();

        let (active, suspended) = {
            let switcher = switcher().with_store(SnapshotDb::new(&path).unwrap());
            switcher.switch_to("s1", request("fix login bug"), &index, &model).unwrap();
            let switched = switcher
                .switch_to("s1", request("charge invoice"), &index, &model)
                .unwrap();
            (switched.profile, switched.suspended.unwrap())
        };

        let switcher = switcher().with_store(SnapshotDb::new(&path).unwrap());
        assert_eq!(switcher.active("s1"), Some(active));
        assert_eq!(switcher.depth("s1"), 1);
        let resumed = switcher.resume("s1", &suspended).unwrap();
        assert_eq!(resumed.profile().task.text, "fix login bug");
        assert!(resumed.profile().entries.iter().any(|e| e.tier == Tier::High));
    }
}
