//! # tasksync-engine
//!
//! The reconciliation core: a pure diff over the three fetched collections
//! and the previous snapshot, plus the dispatcher that replays the resulting
//! actions and the snapshot store that remembers the run. Adapters are
//! consumed only through the [`tasksync_adapters::SourceAdapter`] trait, so
//! the engine never sees store-native shapes.

pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testutil;

pub use dispatcher::{dispatch, ActionFailure, DispatchReport};
pub use error::EngineError;
pub use pipeline::{run, RunReport, SourceFailure};
pub use reconcile::{
    reconcile, Action, CompletionPolicy, ReconcilePlan, SourceCollections, SourceCountPolicy,
};
pub use snapshot::{load_at, load_or_empty_at, save_at, store_path_at, Snapshot};
