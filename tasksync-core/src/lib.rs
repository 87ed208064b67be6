//! tasksync core library — common task model, normalization, configuration.
//!
//! Public API surface:
//! - [`types`] — [`TaskRecord`] and its field types
//! - [`config`] — [`Config`], read from the environment once at startup
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{Description, Priority, Source, TaskRecord};
