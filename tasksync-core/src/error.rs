//! Error types for tasksync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Startup-time configuration failures. These are the only fatal errors in
/// the system — everything downstream is recovered and reported.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("required environment variable {name} is not set")]
    MissingVar { name: &'static str },

    /// The configured todo.txt path does not exist.
    #[error("todo file not found at {path}")]
    TodoFileNotFound { path: PathBuf },
}
