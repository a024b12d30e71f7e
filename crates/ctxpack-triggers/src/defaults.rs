//! Built-in triggers

use crate::event::{Event, EventKind};
use crate::table::{Trigger, TriggerAction, TriggerConfig};
use ctxpack_core::{Completeness, ContextProfile, Cycle, ExclusionReason, PartialReason};

pub const PARTIAL_INDEX: &str = "partial-index";
pub const STALE_INDEX: &str = "stale-index";
pub const CYCLES: &str = "cycles";
pub const BUDGET_PRESSURE: &str = "budget-pressure";
pub const EXCLUSIONS: &str = "exclusions";
pub const CARRY_OVER: &str = "carry-over";
pub const RESUMED: &str = "resumed";
pub const SESSION_END: &str = "session-end";

const LISTED: usize = 3;

pub fn builtin(config: &TriggerConfig) -> Vec<Trigger> {
    let pressure = config.budget_pressure;

    vec![
        Trigger::new(
            PARTIAL_INDEX,
            EventKind::IndexBuilt,
            10,
            |e| matches!(e, Event::IndexBuilt { index } if !index.is_complete()),
            |e| {
                let Event::IndexBuilt { index } = e else {
                    return TriggerAction::Note("index is partial".to_string());
                };
                match index.completeness() {
                    Completeness::Partial {
                        reason,
                        scanned,
                        total,
                    } => {
                        let why = match reason {
                            PartialReason::Cancelled => "cancelled",
                            PartialReason::TimedOut => "timed out",
                        };
                        TriggerAction::Note(format!(
                            "index is partial ({}): {} of {} files scanned",
                            why, scanned, total
                        ))
                    }
                    Completeness::Complete => TriggerAction::Note("index is partial".to_string()),
                }
            },
        ),
        Trigger::new(
            CYCLES,
            EventKind::IndexBuilt,
            20,
            |e| matches!(e, Event::IndexBuilt { index } if !index.cycles().is_empty()),
            |e| {
                let cycles: &[Cycle] = match e {
                    Event::IndexBuilt { index } => index.cycles(),
                    _ => &[],
                };
                let first = cycles
                    .first()
                    .map(|c| c.members.join(" <-> "))
                    .unwrap_or_default();
                TriggerAction::Note(format!(
                    "{} dependency cycle(s), e.g. {}",
                    cycles.len(),
                    first
                ))
            },
        ),
        Trigger::new(
            STALE_INDEX,
            EventKind::ProfileBuilt,
            5,
            |e| e.profile().is_some_and(|p| !p.index_complete),
            |_| TriggerAction::Reindex,
        ),
        Trigger::new(
            BUDGET_PRESSURE,
            EventKind::ProfileBuilt,
            30,
            move |e| e.profile().is_some_and(|p| p.budget > 0 && p.utilization() >= pressure),
            |e| {
                let used = e.profile().map(ContextProfile::utilization).unwrap_or(0.0);
                TriggerAction::Note(format!("{:.0}% of the budget is in use", used * 100.0))
            },
        ),
        Trigger::new(
            EXCLUSIONS,
            EventKind::ProfileBuilt,
            40,
            |e| e.profile().is_some_and(|p| budget_exclusions(p).next().is_some()),
            |e| {
                let left_out: Vec<&str> = e
                    .profile()
                    .map(|p| budget_exclusions(p).collect())
                    .unwrap_or_default();
                TriggerAction::Note(format!(
                    "{} artifact(s) did not fit the budget: {}",
                    left_out.len(),
                    listing(&left_out)
                ))
            },
        ),
        Trigger::new(
            CARRY_OVER,
            EventKind::Switched,
            10,
            |e| matches!(e, Event::Switched { carried_over, .. } if !carried_over.is_empty()),
            |e| {
                let carried: Vec<&str> = match e {
                    Event::Switched { carried_over, .. } => {
                        carried_over.iter().map(String::as_str).collect()
                    }
                    _ => Vec::new(),
                };
                TriggerAction::Note(format!(
                    "carried over from the previous task: {}",
                    listing(&carried)
                ))
            },
        ),
        Trigger::new(
            RESUMED,
            EventKind::Resumed,
            10,
            |_| true,
            |e| match e {
                Event::Resumed {
                    profile,
                    snapshot_id,
                } => TriggerAction::Note(format!(
                    "resumed \"{}\" from snapshot {}",
                    profile.task.text, snapshot_id
                )),
                _ => TriggerAction::Note("resumed".to_string()),
            },
        ),
        Trigger::new(
            SESSION_END,
            EventKind::SessionFinished,
            10,
            |_| true,
            |_| TriggerAction::ScheduleLearning,
        ),
    ]
}

fn budget_exclusions(profile: &ContextProfile) -> impl Iterator<Item = &str> {
    profile
        .exclusions
        .iter()
        .filter(|x| matches!(x.reason, ExclusionReason::BudgetExhausted { .. }))
        .map(|x| x.path.as_str())
}

fn listing(paths: &[&str]) -> String {
    let mut out = paths.iter().take(LISTED).copied().collect::<Vec<_>>().join(", ");
    if paths.len() > LISTED {
        out.push_str(&format!(" and {} more", paths.len() - LISTED));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TriggerTable;
    use chrono::Utc;
    use ctxpack_core::{
        Artifact, ArtifactKind, CodebaseIndex, Exclusion, KeywordClassifier, TaskDescriptor,
    };
    use ctxpack_telemetry::SessionRecord;

    fn table() -> TriggerTable {
        TriggerTable::with_defaults(&TriggerConfig::default())
    }

    fn profile(total_size: usize, budget: usize, excluded: &[&str]) -> ContextProfile {
        ContextProfile {
            id: "p".to_string(),
            task: TaskDescriptor::new("fix login", &KeywordClassifier::new()),
            entries: Vec::new(),
            total_size,
            budget,
            exclusions: excluded
                .iter()
                .map(|p| Exclusion {
                    path: p.to_string(),
                    reason: ExclusionReason::BudgetExhausted {
                        needed: 5,
                        remaining: 0,
                    },
                })
                .collect(),
            notes: Vec::new(),
            index_complete: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_partial_index_and_cycles() {
        let artifact = |path: &str, import: &str| {
            let mut a = Artifact::new(path, ArtifactKind::Source, "x", Utc::now());
            a.imports = vec![import.to_string()];
            a
        };
        let index = CodebaseIndex::new(
            "/r",
            vec![artifact("a.rs", "b.rs"), artifact("b.rs", "a.rs")],
        )
        .with_completeness(Completeness::Partial {
                reason: PartialReason::TimedOut,
                scanned: 2,
                total: 9,
            });

        let notes = table().notes(&Event::IndexBuilt { index: &index });
        assert_eq!(
            notes,
            vec![
                "index is partial (timed out): 2 of 9 files scanned".to_string(),
                "1 dependency cycle(s), e.g. a.rs <-> b.rs".to_string(),
            ]
        );
    }

    #[test]
    fn test_profile_notes() {
        let calm = profile(10, 100, &[]);
        assert!(table().fire(&Event::ProfileBuilt { profile: &calm }).is_empty());

        let tight = profile(95, 100, &["a.rs", "b.rs", "c.rs", "d.rs"]);
        let notes = table().notes(&Event::ProfileBuilt { profile: &tight });
        assert_eq!(
            notes,
            vec![
                "95% of the budget is in use".to_string(),
                "4 artifact(s) did not fit the budget: a.rs, b.rs, c.rs and 1 more".to_string(),
            ]
        );
    }

    #[test]
    fn test_stale_profile_asks_for_reindex() {
        let mut stale = profile(10, 100, &[]);
        stale.index_complete = false;
        assert_eq!(
            table().fire(&Event::ProfileBuilt { profile: &stale }),
            vec![TriggerAction::Reindex]
        );
    }

    #[test]
    fn test_carry_over_note() {
        let p = profile(10, 100, &[]);
        let carried = vec!["src/auth.rs".to_string()];
        let notes = table().notes(&Event::Switched {
            profile: &p,
            suspended: Some("snap"),
            carried_over: &carried,
        });
        assert_eq!(notes, vec!["carried over from the previous task: src/auth.rs"]);
    }

    #[test]
    fn test_session_end_schedules_learning() {
        let record = SessionRecord {
            session_id: "s".to_string(),
            project: "/r".to_string(),
            timestamp: Utc::now(),
            task: "fix login".to_string(),
            task_type: "debugging".to_string(),
            budget: 100,
            used_tokens: 50,
            files_included: ["a.rs", "b.rs", "c.rs", "d.rs", "e.rs"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            files_accessed: vec!["a.rs".to_string()],
            outcome: "completed".to_string(),
            rating: None,
            model_version: None,
        };
        assert_eq!(
            table().fire(&Event::SessionFinished { record: &record }),
            vec![TriggerAction::ScheduleLearning]
        );
    }

    #[test]
    fn test_defaults_can_be_disabled() {
        let config = TriggerConfig {
            disabled: vec![CYCLES.to_string(), SESSION_END.to_string()],
            ..TriggerConfig::default()
        };
        let table = TriggerTable::with_defaults(&config);
        assert!(!table.names().contains(&CYCLES));
        assert!(!table.names().contains(&SESSION_END));
        assert_eq!(table.len(), builtin(&config).len() - 2);
    }
}
