//! Todoist adapter — REST API over HTTPS.
//!
//! Active tasks come from `GET /tasks`, optionally following `Link:
//! rel="next"` pagination. Project ids are resolved to names once per fetch;
//! if the project listing fails the fetch degrades to id-less records rather
//! than failing outright.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tasksync_core::{Description, Priority, Source, TaskRecord};

use crate::error::{rejected, unavailable, AdapterError};
use crate::SourceAdapter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RemoteTask {
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    priority: u8,
    due: Option<RemoteDue>,
    #[serde(default)]
    labels: Vec<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteDue {
    date: String,
}

#[derive(Debug, Deserialize)]
struct RemoteProject {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct NewTask {
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

fn priority_from_remote(value: u8) -> Priority {
    match value {
        1 => Priority::Low,
        2 => Priority::Medium,
        3 => Priority::High,
        4 => Priority::Urgent,
        _ => Priority::None,
    }
}

fn remote_from_priority(priority: Priority) -> Option<u8> {
    match priority {
        Priority::Low => Some(1),
        Priority::Medium => Some(2),
        Priority::High => Some(3),
        Priority::Urgent => Some(4),
        Priority::None => None,
    }
}

/// `due.date` is either `2026-04-15` or a full datetime; the calendar day
/// prefix is all the common model keeps.
fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// Extract the `rel="next"` target from a `Link` response header.
fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let part = part.trim();
        if !part.contains("rel=\"next\"") {
            continue;
        }
        let start = part.find('<')? + 1;
        let end = part.find('>')?;
        return Some(part[start..end].to_string());
    }
    None
}

fn map_remote(task: RemoteTask, projects: &HashMap<String, String>) -> Option<TaskRecord> {
    let Some(description) = Description::normalize(&task.content) else {
        tracing::warn!("todoist: dropping task {} with empty content", task.id);
        return None;
    };
    Some(TaskRecord {
        description,
        source_id: Some(task.id),
        is_completed: task.is_completed,
        priority: priority_from_remote(task.priority),
        due_date: task.due.as_ref().and_then(|d| parse_due_date(&d.date)),
        projects: task
            .project_id
            .as_ref()
            .and_then(|id| projects.get(id).cloned())
            .into_iter()
            .collect(),
        tags: task.labels.into_iter().collect(),
        source: Source::Todoist,
    })
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter for the Todoist cloud store.
pub struct TodoistAdapter {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl TodoistAdapter {
    pub fn new(base_url: String, token: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(HTTP_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request.set("Authorization", &format!("Bearer {}", self.token))
    }

    fn project_names(&self) -> HashMap<String, String> {
        let url = format!("{}/projects", self.base_url);
        let listing: Result<Vec<RemoteProject>, String> = self
            .authorized(self.agent.get(&url))
            .call()
            .map_err(|e| e.to_string())
            .and_then(|r| r.into_json().map_err(|e| e.to_string()));
        match listing {
            Ok(projects) => projects.into_iter().map(|p| (p.id, p.name)).collect(),
            Err(reason) => {
                tracing::warn!("todoist: project listing failed ({reason}), omitting project names");
                HashMap::new()
            }
        }
    }

    /// Fetch all active tasks, following pagination when the server sends it.
    fn remote_state(&self) -> Result<Vec<TaskRecord>, String> {
        let projects = self.project_names();
        let mut records = Vec::new();
        let mut next = Some(format!("{}/tasks", self.base_url));
        while let Some(url) = next {
            let response = self
                .authorized(self.agent.get(&url))
                .call()
                .map_err(|e| e.to_string())?;
            next = response.header("link").and_then(parse_next_link);
            let page: Vec<RemoteTask> = response.into_json().map_err(|e| e.to_string())?;
            records.extend(page.into_iter().filter_map(|t| map_remote(t, &projects)));
        }
        Ok(records)
    }

    fn matching_ids(
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

impl SourceAdapter for TodoistAdapter {
    fn source(&self) -> Source {
        Source::Todoist
    }

    fn fetch(&self) -> Result<Vec<TaskRecord>, AdapterError> {
        self.remote_state()
            .map_err(|reason| unavailable(Source::Todoist, reason))
    }

    fn mark_done(
        &self,
        description: &Description,
        _completion_date: NaiveDate,
    ) -> Result<(), AdapterError> {
        let records = self
            .remote_state()
            .map_err(|reason| rejected(Source::Todoist, description.as_str(), reason))?;
        let ids = Self::matching_ids(&records, description, false);
        if ids.is_empty() {
            tracing::debug!("todoist: no open task for '{description}', nothing to close");
            return Ok(());
        }
        for id in ids {
            let url = format!("{}/tasks/{id}/close", self.base_url);
            self.authorized(self.agent.post(&url))
                .call()
                .map_err(|e| rejected(Source::Todoist, description.as_str(), e))?;
            tracing::info!("todoist: closed '{description}' ({id})");
        }
        Ok(())
    }

    fn delete(&self, description: &Description) -> Result<(), AdapterError> {
        let records = self
            .remote_state()
            .map_err(|reason| rejected(Source::Todoist, description.as_str(), reason))?;
        let ids = Self::matching_ids(&records, description, true);
        if ids.is_empty() {
            tracing::debug!("todoist: no task for '{description}', already gone");
            return Ok(());
        }
        for id in ids {
            let url = format!("{}/tasks/{id}", self.base_url);
            self.authorized(self.agent.delete(&url))
                .call()
                .map_err(|e| rejected(Source::Todoist, description.as_str(), e))?;
            tracing::info!("todoist: deleted '{description}' ({id})");
        }
        Ok(())
    }

    fn add(&self, record: &TaskRecord) -> Result<(), AdapterError> {
        let body = NewTask {
            content: record.description.to_string(),
            priority: remote_from_priority(record.priority),
            due_date: record.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            labels: record.tags.iter().cloned().collect(),
        };
        let url = format!("{}/tasks", self.base_url);
        self.authorized(self.agent.post(&url))
            .send_json(&body)
            .map_err(|e| rejected(Source::Todoist, record.description.as_str(), e))?;
        tracing::info!("todoist: added '{}'", record.description);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
