//! Ordered (event, predicate, action) rules evaluated around context builds

pub mod defaults;
mod event;
mod table;

pub use event::{Event, EventKind};
pub use table::{Trigger, TriggerAction, TriggerConfig, TriggerTable};
