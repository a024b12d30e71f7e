use ctxpack_core::LearningModel;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Shared access to the current learning model.
///
/// Readers take an immutable snapshot and keep scoring against it even if a
/// newer model is committed meanwhile. Updates are serialized so that two
/// concurrent learners cannot both build on the same predecessor.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    current: Arc<RwLock<Arc<LearningModel>>>,
    writer: Arc<Mutex<()>>,
}

impl ModelHandle {
    pub fn new(model: LearningModel) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(model))),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Arc<LearningModel> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Replace the current model wholesale
    pub fn commit(&self, model: LearningModel) -> Arc<LearningModel> {
        let _writing = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.swap(model)
    }

    /// Derive the successor of the current model and publish it
    pub fn update<F>(&self, f: F) -> Arc<LearningModel>
    where
        F: FnOnce(&LearningModel) -> LearningModel,
    {
        let _writing = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot();
        self.swap(f(&base))
    }

    fn swap(&self, model: LearningModel) -> Arc<LearningModel> {
        let next = Arc::new(model);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        next
    }
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::new(LearningModel::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_snapshot_survives_commit() {
        let handle = ModelHandle::default();
        let before = handle.snapshot();

        let mut next = LearningModel::new();
        next.version = 7;
        handle.commit(next);

        assert_eq!(before.version, 0);
        assert_eq!(handle.version(), 7);
    }

    #[test]
    fn test_concurrent_updates_lose_nothing() {
        let handle = ModelHandle::default();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        handle.update(|m| {
                            let mut next = m.clone();
                            next.version += 1;
                            next
                        });
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(handle.version(), 200);
    }
}
