//! Reconciliation: the pure diff between current source state and history.
//!
//! Everything here is side-effect free. The inputs are the three fetched
//! collections plus the previous snapshot; the output is a plan of actions
//! grouped by target source. All I/O stays in the dispatcher and adapters.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use tasksync_core::{Description, Priority, Source, TaskRecord};

use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Source collections
// ---------------------------------------------------------------------------

/// The per-source collections fetched for one run.
///
/// A source that failed to fetch simply holds an empty collection here; the
/// caller decides how loudly to report that.
#[derive(Debug, Default)]
pub struct SourceCollections {
    by_source: BTreeMap<Source, Vec<TaskRecord>>,
}

impl SourceCollections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: Source, records: Vec<TaskRecord>) {
        self.by_source.insert(source, records);
    }

    pub fn records(&self, source: Source) -> &[TaskRecord] {
        self.by_source.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, source: Source) -> usize {
        self.records(source).len()
    }

    /// The Union: every record of every source, in fixed source order.
    pub fn union(&self) -> Vec<&TaskRecord> {
        Source::ALL
            .iter()
            .flat_map(|s| self.records(*s))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// All records sharing one normalized description, with the set of distinct
/// sources they were observed in. Duplicate records within one source grow
/// `records` but not `sources`, so duplicates are never double-counted.
#[derive(Debug)]
struct DescriptionGroup<'a> {
    records: Vec<&'a TaskRecord>,
    sources: BTreeSet<Source>,
}

fn group_by_description<'a>(
    records: &[&'a TaskRecord],
) -> BTreeMap<&'a Description, DescriptionGroup<'a>> {
    let mut groups: BTreeMap<&Description, DescriptionGroup> = BTreeMap::new();
    for &record in records {
        let group = groups
            .entry(&record.description)
            .or_insert_with(|| DescriptionGroup {
                records: Vec::new(),
                sources: BTreeSet::new(),
            });
        group.records.push(record);
        group.sources.insert(record.source);
    }
    groups
}

// ---------------------------------------------------------------------------
// Completion policy
// ---------------------------------------------------------------------------

/// Decides whether a description counts as completed somewhere.
///
/// The baseline signal is crude (see [`SourceCountPolicy`]); the trait exists
/// so a stricter rule can replace it without touching the rest of the engine.
pub trait CompletionPolicy {
    /// `sources_present` is the number of distinct sources currently holding
    /// any record of the description.
    fn is_done_candidate(&self, sources_present: usize) -> bool;
}

/// Count heuristic: a task active everywhere appears once per source; as
/// soon as any source drops or completes it, the count falls below the
/// expected multiplicity. A task that legitimately lives in fewer sources is
/// misclassified, which is the accepted cost of having no shared ids.
#[derive(Debug, Clone, Copy)]
pub struct SourceCountPolicy {
    pub expected_sources: usize,
}

impl Default for SourceCountPolicy {
    fn default() -> Self {
        Self {
            expected_sources: Source::ALL.len(),
        }
    }
}

impl CompletionPolicy for SourceCountPolicy {
    fn is_done_candidate(&self, sources_present: usize) -> bool {
        sources_present < self.expected_sources
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One corrective instruction aimed at a single source.
///
/// `MarkDone` carries the display fields of the task alongside the
/// description so a renderer (or a store that records completions as full
/// entries) does not need to re-resolve them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    MarkDone {
        description: Description,
        completion_date: NaiveDate,
        priority: Priority,
        due_date: Option<NaiveDate>,
        projects: BTreeSet<String>,
        tags: BTreeSet<String>,
    },
    Delete {
        description: Description,
    },
}

impl Action {
    pub fn description(&self) -> &Description {
        match self {
            Action::MarkDone { description, .. } | Action::Delete { description } => description,
        }
    }
}

/// Actions grouped by target source, so all actions against one source can
/// share a connection or process session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcilePlan {
    pub actions: BTreeMap<Source, Vec<Action>>,
}

impl ReconcilePlan {
    fn push(&mut self, source: Source, action: Action) {
        self.actions.entry(source).or_default().push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.values().all(Vec::is_empty)
    }

    pub fn total_actions(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// The diff
// ---------------------------------------------------------------------------

/// Compute the reconciliation plan for one run.
///
/// Deletion takes precedence by construction: a description absent from the
/// whole union never forms a group, so it can only be classified as deleted.
/// Delete actions target the sources that reported the record last run (the
/// snapshot's provenance); mark-done actions target every source that does
/// not already hold a completed record of the description.
pub fn reconcile(
    current: &SourceCollections,
    previous: &Snapshot,
    policy: &dyn CompletionPolicy,
    today: NaiveDate,
) -> ReconcilePlan {
    let union = current.union();
    let groups = group_by_description(&union);
    let mut plan = ReconcilePlan::default();

    // Deleted candidates: in the snapshot, gone from the union.
    let mut previous_sources: BTreeMap<&Description, BTreeSet<Source>> = BTreeMap::new();
    for record in &previous.tasks {
        previous_sources
            .entry(&record.description)
            .or_default()
            .insert(record.source);
    }
    for (description, sources) in &previous_sources {
        if groups.contains_key(*description) {
            continue;
        }
        tracing::info!("'{description}' vanished from every source, deleting stale records");
        for source in sources {
            plan.push(
                *source,
                Action::Delete {
                    description: (*description).clone(),
                },
            );
        }
    }

    // Done candidates: present, but in fewer sources than expected.
    for (description, group) in &groups {
        if !policy.is_done_candidate(group.sources.len()) {
            continue;
        }
        let completed_in: BTreeSet<Source> = group
            .records
            .iter()
            .filter(|r| r.is_completed)
            .map(|r| r.source)
            .collect();
        let template = group
            .records
            .iter()
            .find(|r| !r.is_completed)
            .or_else(|| group.records.first())
            .copied();
        let Some(template) = template else { continue };

        for source in Source::ALL {
            if completed_in.contains(&source) {
                continue;
            }
            plan.push(
                source,
                Action::MarkDone {
                    description: (*description).clone(),
                    completion_date: today,
                    priority: template.priority,
                    due_date: template.due_date,
                    projects: template.projects.clone(),
                    tags: template.tags.clone(),
                },
            );
        }
    }

    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
