//! Key-value metadata stores.
//!
//! The gate only needs get/put/remove on string keys and values. Records are
//! serialized by the repository layer before they reach a store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StorageResult;

/// Key-value capability used to persist metadata.
pub trait MetadataStore: Send {
    /// Value stored under `key`, or `default` if there is none.
    fn get(&self, key: &str, default: &str) -> String;

    /// Store `value` under `key`. Returns `false` if the write failed.
    fn put(&mut self, key: &str, value: &str) -> bool;

    /// Remove `key`. Returns `false` if it did not exist or the removal
    /// could not be persisted, in which case the entry is kept.
    fn remove(&mut self, key: &str) -> bool;

    /// Keys starting with `prefix`, in ascending order.
    fn keys(&self, prefix: &str) -> Vec<String>;
}

impl<S: MetadataStore + ?Sized> MetadataStore for Box<S> {
    fn get(&self, key: &str, default: &str) -> String {
        (**self).get(key, default)
    }

    fn put(&mut self, key: &str, value: &str) -> bool {
        (**self).put(key, value)
    }

    fn remove(&mut self, key: &str) -> bool {
        (**self).remove(key)
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        (**self).keys(prefix)
    }
}

/// In-memory store. Contents are lost on drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn put(&mut self, key: &str, value: &str) -> bool {
        self.entries.insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Store persisted as one JSON object on disk.
///
/// The whole file is rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened metadata file");

        Ok(Self {
            path,
            entries: MemoryStore { entries },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> StorageResult<()> {
        let text = serde_json::to_string_pretty(&self.entries.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl MetadataStore for JsonFileStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.entries.get(key, default)
    }

    fn put(&mut self, key: &str, value: &str) -> bool {
        let previous = self.entries.entries.insert(key.to_string(), value.to_string());
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), key, error = %e, "Metadata write failed");
                match previous {
                    Some(old) => self.entries.entries.insert(key.to_string(), old),
                    None => self.entries.entries.remove(key),
                };
                false
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(previous) = self.entries.entries.remove(key) else {
            return false;
        };
        match self.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), key, error = %e, "Metadata remove failed");
                self.entries.entries.insert(key.to_string(), previous);
                false
            }
        }
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        self.entries.keys(prefix)
    }
}
