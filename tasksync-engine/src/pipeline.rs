//! The full run: fetch, diff, dispatch, persist.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Local, Utc};
use serde::Serialize;

use tasksync_adapters::SourceAdapter;
use tasksync_core::{Source, TaskRecord};

use crate::dispatcher::{dispatch, DispatchReport};
use crate::error::EngineError;
use crate::reconcile::{reconcile, ReconcilePlan, SourceCollections, SourceCountPolicy};
use crate::snapshot::{load_or_empty_at, save_at, Snapshot};

/// Everything one run observed and did, for rendering and inspection.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Records fetched per source (post-normalization).
    pub counts: BTreeMap<Source, usize>,
    /// Sources whose fetch failed; each contributed an empty collection.
    pub unavailable: Vec<SourceFailure>,
    /// Whether a corrupt snapshot had to be discarded.
    pub snapshot_recovered: bool,
    pub plan: ReconcilePlan,
    /// `None` on a dry run.
    pub dispatch: Option<DispatchReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: Source,
    pub reason: String,
}

/// Execute one reconciliation run.
///
/// Fetches run concurrently, one thread per source; the collections are
/// merged only after every fetch has returned. An unavailable source is
/// degraded to an empty collection and reported, never fatal. On a dry run
/// the plan is computed but nothing is dispatched or persisted. Otherwise
/// the snapshot (the union as fetched, before any action mutated a store)
/// is written only after dispatch has finished.
pub fn run(
    home: &Path,
    adapters: &[&dyn SourceAdapter],
    dry_run: bool,
) -> Result<RunReport, EngineError> {
    let fetched: Vec<(Source, Result<Vec<TaskRecord>, _>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = adapters
            .iter()
            .map(|adapter| scope.spawn(move || (adapter.source(), adapter.fetch())))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut collections = SourceCollections::new();
    let mut unavailable = Vec::new();
    for (source, result) in fetched {
        match result {
            Ok(records) => collections.insert(source, records),
            Err(e) => {
                tracing::warn!("fetch failed, treating {source} as empty for this run: {e}");
                unavailable.push(SourceFailure {
                    source,
                    reason: e.to_string(),
                });
                collections.insert(source, Vec::new());
            }
        }
    }

    let (previous, snapshot_recovered) = load_or_empty_at(home);
    let today = Local::now().date_naive();
    let plan = reconcile(&collections, &previous, &SourceCountPolicy::default(), today);

    let counts: BTreeMap<Source, usize> = Source::ALL
        .iter()
        .map(|s| (*s, collections.len(*s)))
        .collect();

    if dry_run {
        return Ok(RunReport {
            counts,
            unavailable,
            snapshot_recovered,
            plan,
            dispatch: None,
        });
    }

    let report = dispatch(&plan, adapters);

    let next = Snapshot {
        synced_at: Some(Utc::now()),
        tasks: collections.union().into_iter().cloned().collect(),
    };
    save_at(home, &next)?;
    tracing::info!(
        "run complete: {} applied, {} failed, snapshot holds {} records",
        report.applied,
        report.failures.len(),
        next.tasks.len()
    );

    Ok(RunReport {
        counts,
        unavailable,
        snapshot_recovered,
        plan,
        dispatch: Some(report),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{load_at, store_path_at};
    use crate::testutil::FakeAdapter;
    use tasksync_core::Description;
    use tempfile::TempDir;

    fn record(text: &str, source: Source) -> TaskRecord {
        TaskRecord::new(Description::normalize(text).unwrap(), source)
    }

    #[test]
    fn run_persists_the_fetched_union() {
        let home = TempDir::new().unwrap();
        let todo =
            FakeAdapter::new(Source::TodoTxt).with_records(vec![record("a", Source::TodoTxt)]);
        let tw = FakeAdapter::new(Source::Taskwarrior)
            .with_records(vec![record("a", Source::Taskwarrior)]);
        let td =
            FakeAdapter::new(Source::Todoist).with_records(vec![record("a", Source::Todoist)]);

        let report = run(home.path(), &[&todo, &tw, &td], false).unwrap();

        assert!(report.plan.is_empty());
        assert!(report.dispatch.unwrap().fully_applied());
        let saved = load_at(home.path()).unwrap();
        assert_eq!(saved.tasks.len(), 3);
        assert!(saved.synced_at.is_some());
    }

    #[test]
    fn dry_run_computes_a_plan_but_touches_nothing() {
        let home = TempDir::new().unwrap();
        let tw = FakeAdapter::new(Source::Taskwarrior)
            .with_records(vec![record("only here", Source::Taskwarrior)]);
        let todo = FakeAdapter::new(Source::TodoTxt);
        let td = FakeAdapter::new(Source::Todoist);

        let report = run(home.path(), &[&todo, &tw, &td], true).unwrap();

        assert!(!report.plan.is_empty());
        assert!(report.dispatch.is_none());
        assert!(tw.calls().is_empty());
        assert!(!store_path_at(home.path()).exists());
    }

    #[test]
    fn unavailable_source_degrades_to_empty() {
        let home = TempDir::new().unwrap();
        let todo = FakeAdapter::new(Source::TodoTxt);
        let tw = FakeAdapter::new(Source::Taskwarrior);
        let td = FakeAdapter::new(Source::Todoist).failing();

        let report = run(home.path(), &[&todo, &tw, &td], false).unwrap();

        assert_eq!(report.unavailable.len(), 1);
        assert_eq!(report.unavailable[0].source, Source::Todoist);
        assert_eq!(report.counts[&Source::Todoist], 0);
    }

    #[test]
    fn vanished_task_gets_dispatched_deletes() {
        let home = TempDir::new().unwrap();
        let seed = Snapshot {
            synced_at: None,
            tasks: vec![
                record("old task", Source::TodoTxt),
                record("old task", Source::Todoist),
            ],
        };
        save_at(home.path(), &seed).unwrap();

        let todo = FakeAdapter::new(Source::TodoTxt);
        let tw = FakeAdapter::new(Source::Taskwarrior);
        let td = FakeAdapter::new(Source::Todoist);
        let report = run(home.path(), &[&todo, &tw, &td], false).unwrap();

        assert_eq!(report.dispatch.unwrap().applied, 2);
        assert_eq!(todo.calls(), vec!["delete old task".to_string()]);
        assert_eq!(td.calls(), vec!["delete old task".to_string()]);
        assert!(tw.calls().is_empty());

        // The new snapshot reflects the emptied stores.
        assert!(load_at(home.path()).unwrap().tasks.is_empty());
    }

    #[test]
    fn rejected_action_is_reported_not_fatal() {
        let home = TempDir::new().unwrap();
        let seed = Snapshot {
            synced_at: None,
            tasks: vec![record("stuck", Source::Todoist)],
        };
        save_at(home.path(), &seed).unwrap();

        let todo = FakeAdapter::new(Source::TodoTxt);
        let tw = FakeAdapter::new(Source::Taskwarrior);
        let td = FakeAdapter::new(Source::Todoist).rejecting("stuck");
        let report = run(home.path(), &[&todo, &tw, &td], false).unwrap();

        let dispatch = report.dispatch.unwrap();
        assert_eq!(dispatch.applied, 0);
        assert_eq!(dispatch.failures.len(), 1);
        // The snapshot is still written so the next run re-derives the delete.
        assert!(store_path_at(home.path()).exists());
    }
}
