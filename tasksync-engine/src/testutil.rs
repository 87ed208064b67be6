//! In-memory adapter double for engine tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use chrono::NaiveDate;

use tasksync_adapters::{AdapterError, SourceAdapter};
use tasksync_core::{Description, Source, TaskRecord};

pub(crate) struct FakeAdapter {
    source: Source,
    records: Vec<TaskRecord>,
    fetch_fails: bool,
    reject: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeAdapter {
    pub(crate) fn new(source: Source) -> Self {
        Self {
            source,
            records: Vec::new(),
            fetch_fails: false,
            reject: BTreeSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_records(mut self, records: Vec<TaskRecord>) -> Self {
        self.records = records;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fetch_fails = true;
        self
    }

    /// Reject every action whose description equals `text`.
    pub(crate) fn rejecting(mut self, text: &str) -> Self {
        self.reject.insert(text.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_reject(&self, description: &Description) -> Result<(), AdapterError> {
        if self.reject.contains(description.as_str()) {
            return Err(AdapterError::ActionRejected {
                source: self.source,
                description: description.to_string(),
                reason: "rejected by test double".to_string(),
            });
        }
        Ok(())
    }
}

impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn fetch(&self) -> Result<Vec<TaskRecord>, AdapterError> {
        if self.fetch_fails {
            return Err(AdapterError::SourceUnavailable {
                source: self.source,
                reason: "down for test".to_string(),
            });
        }
        Ok(self.records.clone())
    }

    fn mark_done(
        &self,
        description: &Description,
        _completion_date: NaiveDate,
    ) -> Result<(), AdapterError> {
        self.check_reject(description)?;
        self.record_call(format!("mark_done {description}"));
        Ok(())
    }

    fn delete(&self, description: &Description) -> Result<(), AdapterError> {
        self.check_reject(description)?;
        self.record_call(format!("delete {description}"));
        Ok(())
    }

    fn add(&self, record: &TaskRecord) -> Result<(), AdapterError> {
        self.check_reject(&record.description)?;
        self.record_call(format!("add {}", record.description));
        Ok(())
    }
}
