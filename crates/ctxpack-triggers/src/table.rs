//! Trigger table: rules evaluated in priority order

use crate::event::{Event, EventKind};
use serde::{Deserialize, Serialize};

/// What a fired trigger asks the engine to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    /// Attach a note to the profile summary
    Note(String),
    /// Feed the finished session to the learner
    ScheduleLearning,
    /// The index should be rebuilt before the next build
    Reindex,
}

type Predicate = Box<dyn Fn(&Event<'_>) -> bool + Send + Sync>;
type Action = Box<dyn Fn(&Event<'_>) -> TriggerAction + Send + Sync>;

pub struct Trigger {
    name: String,
    event: EventKind,
    priority: i32,
    predicate: Predicate,
    action: Action,
}

impl Trigger {
    pub fn new<P, A>(
        name: impl Into<String>,
        event: EventKind,
        priority: i32,
        predicate: P,
        action: A,
    ) -> Self
    where
        P: Fn(&Event<'_>) -> bool + Send + Sync + 'static,
        A: Fn(&Event<'_>) -> TriggerAction + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            event,
            priority,
            predicate: Box::new(predicate),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event(&self) -> EventKind {
        self.event
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    fn fire(&self, event: &Event<'_>) -> Option<TriggerAction> {
        if event.kind() != self.event || !(self.predicate)(event) {
            return None;
        }
        Some((self.action)(event))
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("event", &self.event)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Which triggers run, and their thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Names of triggers that are never registered
    pub disabled: Vec<String>,
    /// Budget utilization at which the budget-pressure note fires
    pub budget_pressure: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            budget_pressure: 0.9,
        }
    }
}

/// Triggers ordered by ascending priority, registration order breaking ties
#[derive(Debug, Default)]
pub struct TriggerTable {
    triggers: Vec<Trigger>,
    disabled: Vec<String>,
}

impl TriggerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table that refuses the triggers `config` disables
    pub fn with_config(config: &TriggerConfig) -> Self {
        Self {
            triggers: Vec::new(),
            disabled: config.disabled.clone(),
        }
    }

    /// The built-in rules, minus the disabled ones
    pub fn with_defaults(config: &TriggerConfig) -> Self {
        let mut table = Self::with_config(config);
        for trigger in crate::defaults::builtin(config) {
            table.register(trigger);
        }
        table
    }

    pub fn register(&mut self, trigger: Trigger) {
        if self.disabled.iter().any(|d| d == trigger.name()) {
            tracing::debug!(trigger = trigger.name(), "trigger disabled");
            return;
        }
        let at = self
            .triggers
            .iter()
            .position(|t| t.priority > trigger.priority)
            .unwrap_or(self.triggers.len());
        self.triggers.insert(at, trigger);
    }

    /// Actions of every matching trigger, in priority order
    pub fn fire(&self, event: &Event<'_>) -> Vec<TriggerAction> {
        self.triggers
            .iter()
            .filter_map(|t| {
                let action = t.fire(event)?;
                tracing::debug!(trigger = t.name(), action = ?action, "trigger fired");
                Some(action)
            })
            .collect()
    }

    /// Only the notes among the actions for `event`
    pub fn notes(&self, event: &Event<'_>) -> Vec<String> {
        self.fire(event)
            .into_iter()
            .filter_map(|a| match a {
                TriggerAction::Note(note) => Some(note),
                _ => None,
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.triggers.iter().map(Trigger::name).collect()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxpack_telemetry::SessionRecord;

    fn record(outcome: &str) -> SessionRecord {
        SessionRecord {
            session_id: "s".to_string(),
            project: "/repo".to_string(),
            timestamp: chrono::Utc::now(),
            task: "t".to_string(),
            task_type: "general".to_string(),
            budget: 100,
            used_tokens: 10,
            files_included: Vec::new(),
            files_accessed: Vec::new(),
            outcome: outcome.to_string(),
            rating: None,
            model_version: None,
        }
    }

    fn note(name: &str, priority: i32) -> Trigger {
        let text = name.to_string();
        Trigger::new(
            name,
            EventKind::SessionFinished,
            priority,
            |_| true,
            move |_| TriggerAction::Note(text.clone()),
        )
    }

    #[test]
    fn test_priority_order_with_stable_ties() {
        let mut table = TriggerTable::new();
        table.register(note("late", 50));
        table.register(note("first", 1));
        table.register(note("tie-a", 10));
        table.register(note("tie-b", 10));

        assert_eq!(table.names(), vec!["first", "tie-a", "tie-b", "late"]);
        let rec = record("completed");
        assert_eq!(
            table.notes(&Event::SessionFinished { record: &rec }),
            vec!["first", "tie-a", "tie-b", "late"]
        );
    }

    #[test]
    fn test_predicate_and_event_filter() {
        let mut table = TriggerTable::new();
        table.register(Trigger::new(
            "abandoned",
            EventKind::SessionFinished,
            0,
            |e| matches!(e, Event::SessionFinished { record } if record.outcome == "abandoned"),
            |_| TriggerAction::Note("abandoned".to_string()),
        ));
        table.register(Trigger::new(
            "reindex",
            EventKind::IndexBuilt,
            0,
            |_| true,
            |_| TriggerAction::Reindex,
        ));

        let done = record("completed");
        assert!(table.fire(&Event::SessionFinished { record: &done }).is_empty());
        let gave_up = record("abandoned");
        assert_eq!(
            table.fire(&Event::SessionFinished { record: &gave_up }),
            vec![TriggerAction::Note("abandoned".to_string())]
        );
    }

    #[test]
    fn test_disabled_trigger_not_registered() {
        let config = TriggerConfig {
            disabled: vec!["late".to_string()],
            ..TriggerConfig::default()
        };
        let mut table = TriggerTable::with_config(&config);
        table.register(note("late", 50));
        table.register(note("kept", 5));
        assert_eq!(table.names(), vec!["kept"]);
    }

    #[test]
    fn test_config_from_json() {
        let config: TriggerConfig =
            serde_json::from_str(r#"{"disabled":["cycles"]}"#).unwrap();
        assert_eq!(config.disabled, vec!["cycles"]);
        assert_eq!(config.budget_pressure, 0.9);
    }
}
