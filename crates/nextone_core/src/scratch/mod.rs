//! Ephemeral key-value scratch state.
//!
//! # Responsibility
//! - Hold non-authoritative UI state, such as the selected task id, outside
//!   the task collection.
//!
//! # Invariants
//! - Scratch values are plain strings keyed by fixed names.
//! - Nothing here is checked against the task store; a selection may point
//!   at a deleted task.

mod file;
mod memory;

pub use file::JsonFileScratchStore;
pub use memory::MemoryScratchStore;

use crate::model::task::TaskId;
use std::path::PathBuf;
use thiserror::Error;

/// Key under which the selected task id is stored.
pub const SELECTION_KEY: &str = "currentTask";

pub type ScratchResult<T> = Result<T, ScratchError>;

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("failed to write scratch file `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode scratch state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Flat string key-value store.
pub trait ScratchStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> ScratchResult<()>;
    fn remove(&mut self, key: &str) -> ScratchResult<()>;
}

/// Reads the selected task id. Malformed values read as no selection.
pub fn read_selection(store: &dyn ScratchStore) -> Option<TaskId> {
    store
        .get(SELECTION_KEY)
        .and_then(|value| value.trim().parse().ok())
}

/// Stores `id` as the selected task.
pub fn write_selection(store: &mut dyn ScratchStore, id: TaskId) -> ScratchResult<()> {
    store.set(SELECTION_KEY, &id.to_string())
}

pub fn clear_selection(store: &mut dyn ScratchStore) -> ScratchResult<()> {
    store.remove(SELECTION_KEY)
}
