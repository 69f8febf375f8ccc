//! JSON file-backed scratch store.
//!
//! The file holds one flat JSON object of string values. It is rewritten on
//! every mutation. An unreadable or corrupt file is treated as empty, since
//! scratch state is never authoritative.

use super::{ScratchError, ScratchResult, ScratchStore};
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct JsonFileScratchStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileScratchStore {
    /// Loads the store from `path`. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = load_values(&path);
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> ScratchResult<()> {
        let encoded = serde_json::to_string_pretty(&self.values)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ScratchError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| ScratchError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ScratchStore for JsonFileScratchStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ScratchResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> ScratchResult<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

fn load_values(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return BTreeMap::new(),
        Err(err) => {
            warn!(
                "event=scratch_load module=scratch status=error error_code=read_failed error={}",
                err
            );
            return BTreeMap::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(
            "event=scratch_load module=scratch status=error error_code=decode_failed error={}",
            err
        );
        BTreeMap::new()
    })
}
