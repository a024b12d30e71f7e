//! Task switching with resumable snapshots

mod snapshot;
mod store;
mod switcher;

pub use snapshot::{ResumeNotes, Snapshot};
pub use store::SnapshotDb;
pub use switcher::{Annotator, ContextSwitcher, SwitchRequest, Switched};
