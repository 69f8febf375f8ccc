//! In-memory scratch store for tests and embedding callers.

use super::{ScratchResult, ScratchStore};
use std::collections::HashMap;

/// Process-local scratch store. Lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryScratchStore {
    values: HashMap<String, String>,
}

impl MemoryScratchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScratchStore for MemoryScratchStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> ScratchResult<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> ScratchResult<()> {
        self.values.remove(key);
        Ok(())
    }
}
