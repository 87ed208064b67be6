//! # tasksync-adapters
//!
//! One adapter per backing store. Each adapter normalizes its store's native
//! shape into the common task model at fetch time and knows how to apply a
//! single reconciliation action. Source-specific text munging (todo.txt line
//! grammar, Taskwarrior export fields, Todoist wire JSON) lives entirely
//! here — the engine only ever sees [`TaskRecord`] values.

pub mod error;
pub mod taskwarrior;
pub mod todo_txt;
pub mod todoist;

pub use error::AdapterError;
pub use taskwarrior::TaskwarriorAdapter;
pub use todo_txt::TodoTxtAdapter;
pub use todoist::TodoistAdapter;

use chrono::NaiveDate;
use tasksync_core::{Description, Source, TaskRecord};

/// Boundary contract between the engine and one backing store.
///
/// Action application is idempotent best-effort: marking done a task the
/// store no longer lists as open, or deleting a task the store no longer
/// holds, is a success. Convergence comes from re-derivation on the next
/// run, not from remembering pending actions.
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Read the store's full current state.
    ///
    /// Fails with [`AdapterError::SourceUnavailable`] when the store cannot
    /// be reached; the pipeline then treats this source as empty for the run.
    fn fetch(&self) -> Result<Vec<TaskRecord>, AdapterError>;

    /// Record `description` as completed on `completion_date`.
    fn mark_done(
        &self,
        description: &Description,
        completion_date: NaiveDate,
    ) -> Result<(), AdapterError>;

    /// Remove every record of `description` from the store.
    fn delete(&self, description: &Description) -> Result<(), AdapterError>;

    /// Create a new task (membership import).
    fn add(&self, record: &TaskRecord) -> Result<(), AdapterError>;
}
