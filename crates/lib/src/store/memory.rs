//! Hash-map store with JSON file persistence.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use tracing::debug;

use super::KvStore;
use crate::Result;

/// In-memory [`KvStore`].
///
/// State lives in a `RwLock`-protected map. [`save_to_file`] /
/// [`load_from_file`] serialize the whole map as one JSON object, which
/// keeps the on-disk form human-readable and diffable.
///
/// [`save_to_file`]: InMemoryKv::save_to_file
/// [`load_from_file`]: InMemoryKv::load_from_file
#[derive(Debug, Default)]
pub struct InMemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store previously written by [`save_to_file`]. A missing
    /// file yields an empty store so first runs need no special casing.
    ///
    /// [`save_to_file`]: InMemoryKv::save_to_file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no store file; starting empty");
            return Ok(Self::new());
        }
        let contents = std::fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), entries = entries.len(), "store loaded");
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Write the whole store to `path` as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let entries = self.entries.read().unwrap();
        let json = serde_json::to_string_pretty(&*entries)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), entries = entries.len(), "store saved");
        Ok(())
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for InMemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().unwrap().remove(key).is_some())
    }
}
