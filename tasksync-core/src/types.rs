//! Domain types for the common task model.
//!
//! Every adapter normalizes its native shape into [`TaskRecord`] at its own
//! boundary; the reconciliation engine only ever sees these types. All types
//! are serializable via serde for the snapshot file.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// Normalized task description — the de facto cross-store join key.
///
/// Built through [`Description::normalize`], which trims whitespace and
/// case-folds. A record whose description normalizes to empty never makes it
/// past the adapter boundary, so a held value is never empty. The original
/// casing is not preserved; equality is always on the folded form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Description(String);

impl Description {
    /// Trim and case-fold `raw`; `None` when nothing remains.
    pub fn normalize(raw: &str) -> Option<Self> {
        let folded = raw.trim().to_lowercase();
        if folded.is_empty() {
            None
        } else {
            Some(Self(folded))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Canonical priority levels. Total order, used for display only — never for
/// reconciliation decisions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::None => write!(f, "none"),
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Which backing store a record was observed in. Provenance only — set by
/// the owning adapter and never mutated afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TodoTxt,
    Taskwarrior,
    Todoist,
}

impl Source {
    /// Every source, in the fixed order used for merging and reporting.
    pub const ALL: [Source; 3] = [Source::TodoTxt, Source::Taskwarrior, Source::Todoist];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::TodoTxt => write!(f, "todo.txt"),
            Source::Taskwarrior => write!(f, "taskwarrior"),
            Source::Todoist => write!(f, "todoist"),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

/// The canonical, source-agnostic task representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub description: Description,
    /// Identifier in the originating store — Taskwarrior uuid or Todoist id.
    /// `None` for todo.txt, which has no stable ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub is_completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub projects: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    pub source: Source,
}

impl TaskRecord {
    /// Bare open record — fields beyond the join key take their empty values.
    pub fn new(description: Description, source: Source) -> Self {
        Self {
            description,
            source_id: None,
            is_completed: false,
            priority: Priority::None,
            due_date: None,
            projects: BTreeSet::new(),
            tags: BTreeSet::new(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
