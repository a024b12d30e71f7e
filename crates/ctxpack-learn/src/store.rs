//! JSON persistence for the per-project learning model

use anyhow::{Context, Result};
use ctxpack_core::{Error, LearningModel};
use ctxpack_telemetry::atomic_write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored model, `None` when nothing has been saved yet.
    ///
    /// Unparseable content is reported as [`Error::ModelCorruption`].
    pub fn load(&self) -> Result<Option<LearningModel>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let model: LearningModel = serde_json::from_str(&contents)
            .map_err(|e| Error::ModelCorruption(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(model))
    }

    /// Load the stored model, falling back to `fresh` when it is absent or
    /// unreadable. Corrupt weights are reset to defaults.
    pub fn load_or_else(&self, fresh: impl FnOnce() -> LearningModel) -> LearningModel {
        match self.load() {
            Ok(Some(model)) => {
                let (model, repaired) = model.repaired();
                if let Some(e) = repaired {
                    tracing::warn!(path = %self.path.display(), error = %e, "repaired stored model");
                }
                model
            }
            Ok(None) => fresh(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable model");
                fresh()
            }
        }
    }

    pub fn save(&self, model: &LearningModel) -> Result<()> {
        let json = serde_json::to_string_pretty(model)?;
        atomic_write(&self.path, json.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), version = model.version, "model saved");
        Ok(())
    }
}
