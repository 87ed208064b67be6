//! Persisted snapshot of the last reconciled union.
//!
//! The snapshot is the engine's only memory between runs. It is what makes
//! deletion detectable at all: a description present here but absent from
//! every live source was removed by the user since the last run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tasksync_core::TaskRecord;

use crate::error::{io_err, EngineError};

const SNAPSHOT_DIR: &str = ".tasksync";
const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was written.
    pub synced_at: Option<DateTime<Utc>>,
    /// The union of all sources at the end of the last run, with the source
    /// provenance of each record preserved.
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

/// Path of the snapshot file under `home`.
pub fn store_path_at(home: &Path) -> PathBuf {
    home.join(SNAPSHOT_DIR).join(SNAPSHOT_FILE)
}

/// Load the snapshot, treating a missing file as a first run.
pub fn load_at(home: &Path) -> Result<Snapshot, EngineError> {
    let path = store_path_at(home);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Snapshot::default()),
        Err(e) => return Err(io_err(&path, e)),
    };
    Ok(serde_json::from_str(&raw)?)
}

/// Like [`load_at`], but a corrupt snapshot degrades to an empty one instead
/// of aborting the run. Returns whether recovery happened, so the caller can
/// surface it.
pub fn load_or_empty_at(home: &Path) -> (Snapshot, bool) {
    match load_at(home) {
        Ok(snapshot) => (snapshot, false),
        Err(e) => {
            tracing::warn!("snapshot unreadable ({e}), starting from empty");
            (Snapshot::default(), true)
        }
    }
}

/// Write the snapshot atomically: serialize to a `.tmp` sibling, then rename
/// over the real file so a crash mid-write never leaves a torn snapshot.
pub fn save_at(home: &Path, snapshot: &Snapshot) -> Result<(), EngineError> {
    let path = store_path_at(home);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let payload = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, &path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
