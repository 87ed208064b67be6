//! todo.txt adapter — one task per line, plain-text grammar.
//!
//! Line shape (all pieces optional except the description text):
//!
//! ```text
//! x 2026-08-30 (A) 2026-08-01 pay rent +home @money due:2026-09-01
//! ```
//!
//! `x` plus a date marks completion, `(A)`..`(Z)` is the priority, a bare
//! leading date is the creation date, `+word` / `@word` are project and tag
//! labels, `due:` carries the due date. There are no stable line ids; tasks
//! are matched purely by normalized description. File rewrites go through a
//! `.tmp` sibling and an atomic rename.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;

use tasksync_core::{ConfigError, Description, Priority, Source, TaskRecord};

use crate::error::{rejected, unavailable, AdapterError};
use crate::SourceAdapter;

const DATE_FMT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Line grammar
// ---------------------------------------------------------------------------

/// One parsed todo.txt line, field for field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TodoLine {
    is_completed: bool,
    completion_date: Option<NaiveDate>,
    priority_marker: Option<char>,
    creation_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    projects: BTreeSet<String>,
    tags: BTreeSet<String>,
    text: String,
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, DATE_FMT).ok()
}

fn parse_priority_marker(token: &str) -> Option<char> {
    let bytes = token.as_bytes();
    if bytes.len() == 3 && bytes[0] == b'(' && bytes[2] == b')' && bytes[1].is_ascii_uppercase() {
        Some(bytes[1] as char)
    } else {
        None
    }
}

fn parse_line(line: &str) -> TodoLine {
    let mut parsed = TodoLine::default();
    let mut tokens = line.split_whitespace().peekable();

    if tokens.peek() == Some(&"x") {
        tokens.next();
        parsed.is_completed = true;
        if let Some(date) = tokens.peek().and_then(|t| parse_date(t)) {
            parsed.completion_date = Some(date);
            tokens.next();
        }
    }

    if let Some(marker) = tokens.peek().and_then(|t| parse_priority_marker(t)) {
        parsed.priority_marker = Some(marker);
        tokens.next();
    }

    if let Some(date) = tokens.peek().and_then(|t| parse_date(t)) {
        parsed.creation_date = Some(date);
        tokens.next();
    }

    let mut words = Vec::new();
    for token in tokens {
        if let Some(project) = token.strip_prefix('+') {
            if !project.is_empty() {
                parsed.projects.insert(project.to_string());
                continue;
            }
        }
        if let Some(tag) = token.strip_prefix('@') {
            if !tag.is_empty() {
                parsed.tags.insert(tag.to_string());
                continue;
            }
        }
        if let Some(date) = token.strip_prefix("due:").and_then(parse_date) {
            parsed.due_date = Some(date);
            continue;
        }
        words.push(token);
    }
    parsed.text = words.join(" ");
    parsed
}

fn format_line(line: &TodoLine) -> String {
    let mut parts: Vec<String> = Vec::new();
    if line.is_completed {
        parts.push("x".to_string());
        if let Some(date) = line.completion_date {
            parts.push(date.format(DATE_FMT).to_string());
        }
    }
    if let Some(marker) = line.priority_marker {
        parts.push(format!("({marker})"));
    }
    if let Some(date) = line.creation_date {
        parts.push(date.format(DATE_FMT).to_string());
    }
    if !line.text.is_empty() {
        parts.push(line.text.clone());
    }
    for project in &line.projects {
        parts.push(format!("+{project}"));
    }
    for tag in &line.tags {
        parts.push(format!("@{tag}"));
    }
    if let Some(date) = line.due_date {
        parts.push(format!("due:{}", date.format(DATE_FMT)));
    }
    parts.join(" ")
}

// ---------------------------------------------------------------------------
// Priority mapping (total — unknown markers fold to None)
// ---------------------------------------------------------------------------

fn priority_from_marker(marker: Option<char>) -> Priority {
    match marker {
        Some('A') => Priority::High,
        Some('B') => Priority::Medium,
        Some('C') => Priority::Low,
        _ => Priority::None,
    }
}

fn marker_from_priority(priority: Priority) -> Option<char> {
    match priority {
        // todo.txt has no urgent level; urgent folds into (A).
        Priority::Urgent | Priority::High => Some('A'),
        Priority::Medium => Some('B'),
        Priority::Low => Some('C'),
        Priority::None => None,
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Adapter for the plain-text todo.txt store.
#[derive(Debug, Clone)]
pub struct TodoTxtAdapter {
    path: PathBuf,
}

impl TodoTxtAdapter {
    /// A missing todo.txt is a startup failure, not a degraded source.
    pub fn new(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::TodoFileNotFound { path });
        }
        Ok(Self { path })
    }

    fn read_contents(&self) -> Result<String, std::io::Error> {
        std::fs::read_to_string(&self.path)
    }

    /// Rewrite the whole file: `.tmp` sibling then atomic rename.
    fn write_lines(&self, lines: &[String]) -> Result<(), std::io::Error> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        let tmp = PathBuf::from(format!("{}.tasksync.tmp", self.path.display()));
        std::fs::write(&tmp, &contents)?;
        if let Err(err) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(err);
        }
        Ok(())
    }

    fn record_from_line(line: &TodoLine) -> Option<TaskRecord> {
        let description = Description::normalize(&line.text)?;
        Some(TaskRecord {
            description,
            source_id: None,
            is_completed: line.is_completed,
            priority: priority_from_marker(line.priority_marker),
            due_date: line.due_date,
            projects: line.projects.clone(),
            tags: line.tags.clone(),
            source: Source::TodoTxt,
        })
    }
}

impl SourceAdapter for TodoTxtAdapter {
    fn source(&self) -> Source {
        Source::TodoTxt
    }

    fn fetch(&self) -> Result<Vec<TaskRecord>, AdapterError> {
        let contents = self
            .read_contents()
            .map_err(|e| unavailable(Source::TodoTxt, e))?;

        let mut records = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = parse_line(line);
            match Self::record_from_line(&parsed) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!("todo.txt: dropping line with empty description: {line:?}");
                }
            }
        }
        Ok(records)
    }

    fn mark_done(
        &self,
        description: &Description,
        completion_date: NaiveDate,
    ) -> Result<(), AdapterError> {
        let contents = self
            .read_contents()
            .map_err(|e| rejected(Source::TodoTxt, description.as_str(), e))?;

        let mut changed = false;
        let lines: Vec<String> = contents
            .lines()
            .map(|raw| {
                let mut parsed = parse_line(raw);
                let is_match = Description::normalize(&parsed.text)
                    .is_some_and(|d| &d == description);
                if is_match && !parsed.is_completed {
                    parsed.is_completed = true;
                    parsed.completion_date = Some(completion_date);
                    changed = true;
                    format_line(&parsed)
                } else {
                    raw.to_string()
                }
            })
            .collect();

        if !changed {
            tracing::debug!("todo.txt: no open line for '{description}', nothing to rewrite");
            return Ok(());
        }
        self.write_lines(&lines)
            .map_err(|e| rejected(Source::TodoTxt, description.as_str(), e))?;
        tracing::info!("todo.txt: marked done '{description}'");
        Ok(())
    }

    fn delete(&self, description: &Description) -> Result<(), AdapterError> {
        let contents = self
            .read_contents()
            .map_err(|e| rejected(Source::TodoTxt, description.as_str(), e))?;

        let mut changed = false;
        let lines: Vec<String> = contents
            .lines()
            .filter(|raw| {
                let is_match = Description::normalize(&parse_line(raw).text)
                    .is_some_and(|d| &d == description);
                if is_match {
                    changed = true;
                }
                !is_match
            })
            .map(str::to_string)
            .collect();

        if !changed {
            tracing::debug!("todo.txt: no line for '{description}', already gone");
            return Ok(());
        }
        self.write_lines(&lines)
            .map_err(|e| rejected(Source::TodoTxt, description.as_str(), e))?;
        tracing::info!("todo.txt: deleted '{description}'");
        Ok(())
    }

    fn add(&self, record: &TaskRecord) -> Result<(), AdapterError> {
        let line = format_line(&TodoLine {
            is_completed: record.is_completed,
            completion_date: None,
            priority_marker: marker_from_priority(record.priority),
            creation_date: None,
            due_date: record.due_date,
            projects: record.projects.clone(),
            tags: record.tags.clone(),
            text: record.description.to_string(),
        });

        let contents = self
            .read_contents()
            .map_err(|e| rejected(Source::TodoTxt, record.description.as_str(), e))?;
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
        lines.push(line);
        self.write_lines(&lines)
            .map_err(|e| rejected(Source::TodoTxt, record.description.as_str(), e))?;
        tracing::info!("todo.txt: added '{}'", record.description);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn adapter_with(contents: &str) -> (TempDir, TodoTxtAdapter) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todo.txt");
        std::fs::write(&path, contents).unwrap();
        (dir, TodoTxtAdapter::new(path).unwrap())
    }

    fn desc(raw: &str) -> Description {
        Description::normalize(raw).unwrap()
    }

    #[test]
    fn constructor_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let err = TodoTxtAdapter::new(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::TodoFileNotFound { .. }));
    }

    #[test]
    fn parses_fully_loaded_line() {
        let parsed =
            parse_line("x 2026-08-30 (A) 2026-08-01 pay rent +home @money due:2026-09-01");
        assert!(parsed.is_completed);
        assert_eq!(parsed.completion_date, Some(date(2026, 8, 30)));
        assert_eq!(parsed.priority_marker, Some('A'));
        assert_eq!(parsed.creation_date, Some(date(2026, 8, 1)));
        assert_eq!(parsed.due_date, Some(date(2026, 9, 1)));
        assert!(parsed.projects.contains("home"));
        assert!(parsed.tags.contains("money"));
        assert_eq!(parsed.text, "pay rent");
    }

    #[test]
    fn parses_bare_line() {
        let parsed = parse_line("buy milk");
        assert_eq!(parsed, TodoLine {
            text: "buy milk".to_string(),
            ..TodoLine::default()
        });
    }

    #[test]
    fn x_inside_description_is_not_completion() {
        let parsed = parse_line("fix x axis rendering");
        assert!(!parsed.is_completed);
        assert_eq!(parsed.text, "fix x axis rendering");
    }

    #[test]
    fn format_parse_roundtrip() {
        for line in [
            "buy milk",
            "(B) water the plants +garden",
            "x 2026-08-30 (A) 2026-08-01 pay rent +home @money due:2026-09-01",
            "call mum @family due:2026-12-24",
        ] {
            assert_eq!(format_line(&parse_line(line)), line);
        }
    }

    #[rstest]
    #[case(Some('A'), Priority::High)]
    #[case(Some('B'), Priority::Medium)]
    #[case(Some('C'), Priority::Low)]
    #[case(Some('D'), Priority::None)]
    #[case(None, Priority::None)]
    fn marker_mapping_is_total(#[case] marker: Option<char>, #[case] expected: Priority) {
        assert_eq!(priority_from_marker(marker), expected);
    }

    #[test]
    fn fetch_skips_blank_and_empty_description_lines() {
        let (_dir, adapter) = adapter_with("buy milk\n\n+orphan @label\n(A) file taxes\n");
        let records = adapter.fetch().unwrap();
        let names: Vec<_> = records.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(names, vec!["buy milk", "file taxes"]);
        assert_eq!(records[1].priority, Priority::High);
    }

    #[test]
    fn fetch_includes_completed_lines() {
        let (_dir, adapter) = adapter_with("x 2026-08-29 pay rent\nbuy milk\n");
        let records = adapter.fetch().unwrap();
        assert!(records[0].is_completed);
        assert!(!records[1].is_completed);
    }

    #[test]
    fn mark_done_rewrites_only_matching_open_line() {
        let (dir, adapter) = adapter_with("buy milk\n(A) file taxes due:2026-04-15\n");
        adapter.mark_done(&desc("File Taxes"), date(2026, 8, 30)).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        assert_eq!(
            contents,
            "buy milk\nx 2026-08-30 (A) file taxes due:2026-04-15\n"
        );
    }

    #[test]
    fn mark_done_without_match_is_a_noop_success() {
        let (dir, adapter) = adapter_with("buy milk\n");
        adapter.mark_done(&desc("ship release"), date(2026, 8, 30)).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        assert_eq!(contents, "buy milk\n");
    }

    #[test]
    fn mark_done_is_idempotent() {
        let (dir, adapter) = adapter_with("buy milk\n");
        adapter.mark_done(&desc("buy milk"), date(2026, 8, 30)).unwrap();
        let after_first = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        adapter.mark_done(&desc("buy milk"), date(2026, 8, 31)).unwrap();
        let after_second = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        assert_eq!(after_first, after_second, "completed line must not be restamped");
    }

    #[test]
    fn delete_removes_open_and_completed_lines() {
        let (dir, adapter) = adapter_with("old task\nx 2026-08-01 old task\nbuy milk\n");
        adapter.delete(&desc("old task")).unwrap();
        let contents = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        assert_eq!(contents, "buy milk\n");
    }

    #[test]
    fn delete_of_absent_task_succeeds() {
        let (_dir, adapter) = adapter_with("buy milk\n");
        adapter.delete(&desc("never existed")).unwrap();
    }

    #[test]
    fn add_appends_formatted_line() {
        let (dir, adapter) = adapter_with("buy milk\n");
        let mut record = TaskRecord::new(desc("ship release"), Source::Taskwarrior);
        record.priority = Priority::Medium;
        record.due_date = Some(date(2026, 9, 15));
        record.projects.insert("work".to_string());
        adapter.add(&record).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("todo.txt")).unwrap();
        assert_eq!(contents, "buy milk\n(B) ship release +work due:2026-09-15\n");
    }

    #[test]
    fn rewrite_leaves_no_tmp_file() {
        let (dir, adapter) = adapter_with("buy milk\n");
        adapter.mark_done(&desc("buy milk"), date(2026, 8, 30)).unwrap();
        assert!(!dir.path().join("todo.txt.tasksync.tmp").exists());
    }
}
