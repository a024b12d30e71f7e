use ctxpack_core::{CodebaseIndex, ContextProfile};
use ctxpack_telemetry::SessionRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    IndexBuilt,
    ProfileBuilt,
    Switched,
    Resumed,
    SessionFinished,
}

/// Something the engine just did, with the data it produced
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    IndexBuilt {
        index: &'a CodebaseIndex,
    },
    ProfileBuilt {
        profile: &'a ContextProfile,
    },
    Switched {
        profile: &'a ContextProfile,
        suspended: Option<&'a str>,
        carried_over: &'a [String],
    },
    Resumed {
        profile: &'a ContextProfile,
        snapshot_id: &'a str,
    },
    SessionFinished {
        record: &'a SessionRecord,
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::IndexBuilt { .. } => EventKind::IndexBuilt,
            Event::ProfileBuilt { .. } => EventKind::ProfileBuilt,
            Event::Switched { .. } => EventKind::Switched,
            Event::Resumed { .. } => EventKind::Resumed,
            Event::SessionFinished { .. } => EventKind::SessionFinished,
        }
    }

    /// The profile the event concerns, if any
    pub fn profile(&self) -> Option<&ContextProfile> {
        match self {
            Event::ProfileBuilt { profile }
            | Event::Switched { profile, .. }
            | Event::Resumed { profile, .. } => Some(*profile),
            _ => None,
        }
    }
}
