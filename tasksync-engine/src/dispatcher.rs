//! Applies a reconciliation plan through the source adapters.
//!
//! Per-action failure isolation: a rejected action is recorded and the run
//! moves on. There is no retry queue; an unapplied action is simply
//! re-derived on the next run from the same inputs.

use serde::Serialize;

use tasksync_adapters::SourceAdapter;
use tasksync_core::Source;

use crate::reconcile::{Action, ReconcilePlan};

/// One action that a backend refused.
#[derive(Debug, Clone, Serialize)]
pub struct ActionFailure {
    pub source: Source,
    pub description: String,
    pub reason: String,
}

/// Outcome of replaying one plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub applied: usize,
    pub failures: Vec<ActionFailure>,
}

impl DispatchReport {
    pub fn fully_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Replay `plan` against `adapters`.
///
/// Actions are applied source by source, serially within a source (the
/// Taskwarrior CLI transport is not concurrency-safe). Every action is
/// attempted regardless of earlier failures.
pub fn dispatch(plan: &ReconcilePlan, adapters: &[&dyn SourceAdapter]) -> DispatchReport {
    let mut report = DispatchReport::default();

    for (source, actions) in &plan.actions {
        let adapter = adapters.iter().find(|a| a.source() == *source);
        for action in actions {
            let Some(adapter) = adapter else {
                report.failures.push(ActionFailure {
                    source: *source,
                    description: action.description().to_string(),
                    reason: "no adapter registered for source".to_string(),
                });
                continue;
            };
            let outcome = match action {
                Action::MarkDone {
                    description,
                    completion_date,
                    ..
                } => adapter.mark_done(description, *completion_date),
                Action::Delete { description } => adapter.delete(description),
            };
            match outcome {
                Ok(()) => {
                    tracing::info!("applied {action:?} to {source}");
                    report.applied += 1;
                }
                Err(e) => {
                    tracing::warn!("action failed on {source}: {e}");
                    report.failures.push(ActionFailure {
                        source: *source,
                        description: action.description().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeAdapter;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use tasksync_core::{Description, Priority};

    fn mark_done(text: &str) -> Action {
        Action::MarkDone {
            description: Description::normalize(text).unwrap(),
            completion_date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            priority: Priority::None,
            due_date: None,
            projects: BTreeSet::new(),
            tags: BTreeSet::new(),
        }
    }

    fn delete(text: &str) -> Action {
        Action::Delete {
            description: Description::normalize(text).unwrap(),
        }
    }

    #[test]
    fn applies_actions_to_the_owning_adapter() {
        let todo = FakeAdapter::new(Source::TodoTxt);
        let tw = FakeAdapter::new(Source::Taskwarrior);
        let mut plan = ReconcilePlan::default();
        plan.actions
            .entry(Source::TodoTxt)
            .or_default()
            .push(mark_done("buy milk"));
        plan.actions
            .entry(Source::Taskwarrior)
            .or_default()
            .push(delete("old task"));

        let report = dispatch(&plan, &[&todo, &tw]);

        assert_eq!(report.applied, 2);
        assert!(report.fully_applied());
        assert_eq!(todo.calls(), vec!["mark_done buy milk".to_string()]);
        assert_eq!(tw.calls(), vec!["delete old task".to_string()]);
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let todo = FakeAdapter::new(Source::TodoTxt).rejecting("flaky");
        let tw = FakeAdapter::new(Source::Taskwarrior);
        let mut plan = ReconcilePlan::default();
        plan.actions
            .entry(Source::TodoTxt)
            .or_default()
            .push(mark_done("flaky"));
        plan.actions
            .entry(Source::TodoTxt)
            .or_default()
            .push(mark_done("steady"));
        plan.actions
            .entry(Source::Taskwarrior)
            .or_default()
            .push(delete("old task"));

        let report = dispatch(&plan, &[&todo, &tw]);

        assert_eq!(report.applied, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, Source::TodoTxt);
        assert_eq!(report.failures[0].description, "flaky");
        assert_eq!(tw.calls(), vec!["delete old task".to_string()]);
    }

    #[test]
    fn missing_adapter_is_a_recorded_failure() {
        let mut plan = ReconcilePlan::default();
        plan.actions
            .entry(Source::Todoist)
            .or_default()
            .push(delete("orphan"));

        let report = dispatch(&plan, &[]);

        assert_eq!(report.applied, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, Source::Todoist);
    }
}
