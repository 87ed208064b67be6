//! Taskwarrior adapter — subprocess invocation of the `task` CLI.
//!
//! State is read with `task export` (a JSON array covering pending and
//! completed tasks); actions resolve the stable uuid by normalized
//! description first and then run `task <uuid> done` / `task <uuid> delete`.
//! The CLI transport is not concurrency-safe, so callers apply actions for
//! this source serially.

use std::process::Command;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use tasksync_core::{Description, Priority, Source, TaskRecord};

use crate::error::{rejected, unavailable, AdapterError};
use crate::SourceAdapter;

// ---------------------------------------------------------------------------
// Export wire shape
// ---------------------------------------------------------------------------

/// One entry of `task export`. Only the fields the common model needs;
/// everything else (annotations, urgency, recurrence) is ignored.
#[derive(Debug, Deserialize)]
struct ExportEntry {
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: String,
    uuid: Option<String>,
    priority: Option<String>,
    due: Option<String>,
    project: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn priority_from_code(code: Option<&str>) -> Priority {
    match code {
        Some("H") => Priority::High,
        Some("M") => Priority::Medium,
        Some("L") => Priority::Low,
        _ => Priority::None,
    }
}

fn code_from_priority(priority: Priority) -> Option<&'static str> {
    match priority {
        // Taskwarrior has no urgent level; urgent folds into H.
        Priority::Urgent | Priority::High => Some("H"),
        Priority::Medium => Some("M"),
        Priority::Low => Some("L"),
        Priority::None => None,
    }
}

/// Taskwarrior emits `20260415T120000Z` in exports; ISO dates show up in
/// hand-edited data files. Anything unparseable normalizes to absent.
fn parse_export_date(raw: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ")
        .map(|dt| dt.date())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// Map an export payload to common records.
///
/// Deleted tasks are skipped (they no longer exist as far as reconciliation
/// is concerned) and entries whose description normalizes to empty are
/// dropped with a warning.
fn parse_export(payload: &[u8]) -> Result<Vec<TaskRecord>, serde_json::Error> {
    let entries: Vec<ExportEntry> = serde_json::from_slice(payload)?;
    let mut records = Vec::new();
    for entry in entries {
        if entry.status == "deleted" {
            continue;
        }
        let Some(description) = Description::normalize(&entry.description) else {
            tracing::warn!("taskwarrior: dropping export entry with empty description");
            continue;
        };
        records.push(TaskRecord {
            description,
            source_id: entry.uuid,
            is_completed: entry.status == "completed",
            priority: priority_from_code(entry.priority.as_deref()),
            due_date: entry.due.as_deref().and_then(parse_export_date),
            projects: entry.project.into_iter().collect(),
            tags: entry.tags.into_iter().collect(),
            source: Source::Taskwarrior,
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter for the local Taskwarrior store.
#[derive(Debug, Clone)]
pub struct TaskwarriorAdapter {
    bin: String,
}

impl TaskwarriorAdapter {
    /// `bin` is the Taskwarrior executable, from [`tasksync_core::Config`].
    pub fn new(bin: String) -> Self {
        Self { bin }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, String> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.bin))?;
        if !output.status.success() {
            return Err(format!(
                "`{} {}` exited with {}: {}",
                self.bin,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(output.stdout)
    }

    fn export(&self) -> Result<Vec<TaskRecord>, String> {
        let payload = self.run(&["export"])?;
        parse_export(&payload).map_err(|e| format!("unparseable export: {e}"))
    }

    /// Uuids of current records matching `description`.
    fn matching_uuids(
        records: &[TaskRecord],
        description: &Description,
        include_completed: bool,
    ) -> Vec<String> {
        records
            .iter()
            .filter(|r| &r.description == description)
            .filter(|r| include_completed || !r.is_completed)
            .filter_map(|r| r.source_id.clone())
            .collect()
    }
}

impl SourceAdapter for TaskwarriorAdapter {
    fn source(&self) -> Source {
        Source::Taskwarrior
    }

    fn fetch(&self) -> Result<Vec<TaskRecord>, AdapterError> {
        self.export()
            .map_err(|reason| unavailable(Source::Taskwarrior, reason))
    }

    fn mark_done(
        &self,
        description: &Description,
        _completion_date: NaiveDate,
    ) -> Result<(), AdapterError> {
        let records = self
            .export()
            .map_err(|reason| rejected(Source::Taskwarrior, description.as_str(), reason))?;
        let uuids = Self::matching_uuids(&records, description, false);
        if uuids.is_empty() {
            tracing::debug!("taskwarrior: no open task for '{description}', nothing to close");
            return Ok(());
        }
        for uuid in uuids {
            self.run(&["rc.confirmation=off", &uuid, "done"])
                .map_err(|reason| rejected(Source::Taskwarrior, description.as_str(), reason))?;
            tracing::info!("taskwarrior: marked done '{description}' ({uuid})");
        }
        Ok(())
    }

    fn delete(&self, description: &Description) -> Result<(), AdapterError> {
        let records = self
            .export()
            .map_err(|reason| rejected(Source::Taskwarrior, description.as_str(), reason))?;
        let uuids = Self::matching_uuids(&records, description, true);
        if uuids.is_empty() {
            tracing::debug!("taskwarrior: no task for '{description}', already gone");
            return Ok(());
        }
        for uuid in uuids {
            self.run(&["rc.confirmation=off", &uuid, "delete"])
                .map_err(|reason| rejected(Source::Taskwarrior, description.as_str(), reason))?;
            tracing::info!("taskwarrior: deleted '{description}' ({uuid})");
        }
        Ok(())
    }

    fn add(&self, record: &TaskRecord) -> Result<(), AdapterError> {
        let mut args: Vec<String> = vec!["add".to_string(), record.description.to_string()];
        if let Some(code) = code_from_priority(record.priority) {
            args.push(format!("priority:{code}"));
        }
        if let Some(due) = record.due_date {
            args.push(format!("due:{}", due.format("%Y-%m-%d")));
        }
        if let Some(project) = record.projects.iter().next() {
            args.push(format!("project:{project}"));
        }
        if !record.tags.is_empty() {
            let joined: Vec<&str> = record.tags.iter().map(String::as_str).collect();
            args.push(format!("tags:{}", joined.join(",")));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs)
            .map_err(|reason| rejected(Source::Taskwarrior, record.description.as_str(), reason))?;
        tracing::info!("taskwarrior: added '{}'", record.description);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
