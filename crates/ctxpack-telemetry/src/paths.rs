//! Path resolution for per-project persisted state

use std::path::{Path, PathBuf};

/// Resolves where session stacks, the learning model and history live
#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    /// State rooted at `~/.ctxpack`
    pub fn new() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;
        Ok(Self {
            base: home.join(".ctxpack"),
        })
    }

    /// State rooted at an explicit directory
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Engine-wide configuration file
    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Project-scoped directory keyed by the repository root
    pub fn project_dir(&self, root: &Path) -> PathBuf {
        let key = root
            .to_string_lossy()
            .trim_matches('/')
            .replace(['/', '\\', '.', ':'], "-");
        let key = if key.is_empty() {
            "root".to_string()
        } else {
            key
        };
        self.base.join("projects").join(key)
    }

    /// SQLite database holding suspended snapshots
    pub fn snapshots_db(&self, root: &Path) -> PathBuf {
        self.project_dir(root).join("snapshots.db")
    }

    /// Versioned learning model state
    pub fn model_file(&self, root: &Path) -> PathBuf {
        self.project_dir(root).join("learning_model.json")
    }

    /// Append-only session history
    pub fn history_file(&self, root: &Path) -> PathBuf {
        self.project_dir(root).join("sessions.jsonl")
    }
}
