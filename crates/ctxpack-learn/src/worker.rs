//! Out-of-band learning on a tokio task

use crate::handle::ModelHandle;
use crate::learner::FeedbackLearner;
use crate::log::SessionLog;
use crate::store::ModelStore;
use ctxpack_core::{Error, LearningModel, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Where a learned model is committed and persisted
#[derive(Debug, Clone, Default)]
pub struct LearningTarget {
    pub model: ModelHandle,
    pub store: Option<ModelStore>,
}

impl LearningTarget {
    pub fn new(model: ModelHandle, store: Option<ModelStore>) -> Self {
        Self { model, store }
    }

    /// Learn `log` into the target model and persist the result
    pub fn apply(&self, learner: &FeedbackLearner, log: &SessionLog) -> Arc<LearningModel> {
        let committed = self.model.update(|model| learner.learn(model, log));
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&committed) {
                tracing::warn!(version = committed.version, error = %e, "failed to persist model");
            }
        }
        committed
    }
}

struct Job {
    log: SessionLog,
    target: LearningTarget,
    done: Option<oneshot::Sender<u64>>,
}

/// Applies session logs in arrival order without blocking the callers that
/// submit them. Every job names the model it trains, so one worker serves
/// any number of projects.
pub struct LearnerWorker {
    tx: mpsc::UnboundedSender<Job>,
    task: JoinHandle<()>,
}

impl LearnerWorker {
    /// Start the worker on the current tokio runtime
    pub fn spawn(learner: FeedbackLearner) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let task = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let committed = job.target.apply(&learner, &job.log);
                if let Some(done) = job.done {
                    let _ = done.send(committed.version);
                }
            }
            tracing::debug!("learner worker drained");
        });
        Self { tx, task }
    }

    /// Queue a log for learning and return immediately
    pub fn submit(&self, log: SessionLog, target: LearningTarget) -> Result<()> {
        self.tx
            .send(Job {
                log,
                target,
                done: None,
            })
            .map_err(|_| Error::LearnerStopped)
    }

    /// Queue a log and wait for the model version that includes it
    pub async fn submit_and_wait(&self, log: SessionLog, target: LearningTarget) -> Result<u64> {
        let (done, committed) = oneshot::channel();
        self.tx
            .send(Job {
                log,
                target,
                done: Some(done),
            })
            .map_err(|_| Error::LearnerStopped)?;
        committed.await.map_err(|_| Error::LearnerStopped)
    }

    /// Finish every queued log, then stop
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "learner worker ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ctxpack_core::{
        ContextProfile, EntryContent, FeatureVector, KeywordClassifier, ProfileEntry,
        TaskDescriptor, Tier,
    };
    use tempfile::TempDir;

    fn log() -> SessionLog {
        let entry = |path: &str, keyword_match: f64| ProfileEntry {
            path: path.to_string(),
            tier: Tier::High,
            score: keyword_match,
            features: FeatureVector {
                keyword_match,
                ..FeatureVector::default()
            },
            size: 5,
            content: EntryContent::Reference,
        };
        let profile = ContextProfile {
            id: "p".to_string(),
            task: TaskDescriptor::new("refactor the store", &KeywordClassifier::new()),
            entries: vec![entry("store.rs", 0.9), entry("util.rs", 0.1)],
            total_size: 10,
            budget: 50,
            exclusions: Vec::new(),
            notes: Vec::new(),
            index_complete: true,
            created_at: Utc::now(),
        };
        SessionLog::new(profile, vec!["store.rs".to_string()])
    }

    #[tokio::test]
    async fn test_submit_and_wait_returns_committed_version() {
        let target = LearningTarget::default();
        let worker = LearnerWorker::spawn(FeedbackLearner::default());

        worker.submit(log(), target.clone()).unwrap();
        let version = worker.submit_and_wait(log(), target.clone()).await.unwrap();

        assert_eq!(version, 2);
        assert_eq!(target.model.version(), 2);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_persists_and_drains_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("learning_model.json"));
        let target = LearningTarget::new(ModelHandle::default(), Some(store.clone()));
        let worker = LearnerWorker::spawn(FeedbackLearner::default());

        for _ in 0..5 {
            worker.submit(log(), target.clone()).unwrap();
        }
        worker.shutdown().await;

        assert_eq!(target.model.version(), 5);
        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.version, 5);
        assert_eq!(saved.access_counts.get("store.rs"), Some(&5));
    }

    #[tokio::test]
    async fn test_jobs_learn_into_their_own_targets() {
        let dir = TempDir::new().unwrap();
        let first = LearningTarget::new(
            ModelHandle::default(),
            Some(ModelStore::new(dir.path().join("first.json"))),
        );
        let second = LearningTarget::new(
            ModelHandle::default(),
            Some(ModelStore::new(dir.path().join("second.json"))),
        );
        let worker = LearnerWorker::spawn(FeedbackLearner::default());

        worker.submit(log(), first.clone()).unwrap();
        worker.submit(log(), second.clone()).unwrap();
        worker.submit(log(), second.clone()).unwrap();
        worker.shutdown().await;

        assert_eq!(first.model.version(), 1);
        assert_eq!(second.model.version(), 2);
        let saved = |target: &LearningTarget| {
            target.store.as_ref().unwrap().load().unwrap().unwrap().version
        };
        assert_eq!(saved(&first), 1);
        assert_eq!(saved(&second), 2);
    }
}
