//! Error types for tasksync-adapters.

use std::fmt;

use tasksync_core::Source;

/// Boundary failures a source adapter can surface.
///
/// Both variants are recoverable by design: the pipeline substitutes an
/// empty collection for an unavailable source, and the dispatcher collects
/// rejected actions while the run continues.
///
/// `Display` and `Error` are implemented by hand because the `source`
/// fields hold a [`Source`] identifier, not a nested error, so thiserror's
/// source-field inference does not apply.
#[derive(Debug)]
pub enum AdapterError {
    /// The backing store could not be reached at fetch time.
    SourceUnavailable { source: Source, reason: String },

    /// The store refused a single mark-done, delete, or add action.
    ActionRejected {
        source: Source,
        description: String,
        reason: String,
    },
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::SourceUnavailable { source, reason } => {
                write!(f, "{source} unavailable: {reason}")
            }
            AdapterError::ActionRejected {
                source,
                description,
                reason,
            } => {
                write!(f, "{source} rejected action for '{description}': {reason}")
            }
        }
    }
}

impl std::error::Error for AdapterError {}

/// Convenience constructor for [`AdapterError::SourceUnavailable`].
pub(crate) fn unavailable(source: Source, reason: impl fmt::Display) -> AdapterError {
    AdapterError::SourceUnavailable {
        source,
        reason: reason.to_string(),
    }
}

/// Convenience constructor for [`AdapterError::ActionRejected`].
pub(crate) fn rejected(
    source: Source,
    description: impl Into<String>,
    reason: impl fmt::Display,
) -> AdapterError {
    AdapterError::ActionRejected {
        source,
        description: description.into(),
        reason: reason.to_string(),
    }
}
