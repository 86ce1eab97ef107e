//! Persisted preferences with change notifications.
//!
//! There is a single key today, `enabled`. Absent means on; every read site
//! goes through [`resolve_enabled`] instead of comparing against `false`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const ENABLED_KEY: &str = "enabled";

const CHANGE_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Delivered to subscribers on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub new_value: Option<bool>,
}

/// Key/value storage for boolean preferences. Last write wins.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError>;
    fn set(&self, key: &str, value: bool) -> Result<(), StoreError>;
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;

    /// Picks up writes made behind this handle's back, such as another
    /// process writing the same file, and broadcasts them like local ones.
    fn refresh(&self) {}
}

pub fn resolve_enabled(value: Option<bool>) -> bool {
    value.unwrap_or(true)
}

/// Reads `enabled`, falling back to the default when the store can't be read.
pub fn load_enabled(store: &dyn PreferenceStore) -> bool {
    match store.get(ENABLED_KEY) {
        Ok(value) => resolve_enabled(value),
        Err(err) => {
            warn!("could not read preference, using default: {err}");
            resolve_enabled(None)
        }
    }
}

/// Last state of the file this store has seen.
#[derive(Default)]
struct Snapshot {
    modified: Option<SystemTime>,
    len: u64,
    table: toml::Table,
}

/// Preferences kept in a TOML table on disk.
///
/// Other processes may write the same file (the CLI `enable`/`disable`
/// commands do). [`refresh`](PreferenceStore::refresh) notices those writes
/// by file modification time and broadcasts the keys that changed.
pub struct FileStore {
    path: PathBuf,
    changes: broadcast::Sender<StorageChange>,
    seen: Mutex<Snapshot>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        let store = Self {
            path: path.into(),
            changes,
            seen: Mutex::new(Snapshot::default()),
        };
        match store.snapshot() {
            Ok(snapshot) => *store.lock_seen() = snapshot,
            Err(err) => debug!("no usable storage snapshot yet: {err}"),
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_seen(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_table(&self) -> Result<toml::Table, StoreError> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(content.parse::<toml::Table>()?)
    }

    fn stamp(&self) -> (Option<SystemTime>, u64) {
        match fs::metadata(&self.path) {
            Ok(meta) => (meta.modified().ok(), meta.len()),
            Err(_) => (None, 0),
        }
    }

    fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let (modified, len) = self.stamp();
        Ok(Snapshot {
            modified,
            len,
            table: self.read_table()?,
        })
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError> {
        let table = self.read_table()?;
        Ok(table.get(key).and_then(toml::Value::as_bool))
    }

    fn set(&self, key: &str, value: bool) -> Result<(), StoreError> {
        let mut doc = self.read_table()?;
        doc.insert(key.to_string(), toml::Value::Boolean(value));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, doc.to_string())?;
        debug!(key, value, path = %self.path.display(), "preference written");

        let (modified, len) = self.stamp();
        *self.lock_seen() = Snapshot {
            modified,
            len,
            table: doc,
        };
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            new_value: Some(value),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    fn refresh(&self) {
        let mut seen = self.lock_seen();
        if self.stamp() == (seen.modified, seen.len) {
            return;
        }
        let fresh = match self.snapshot() {
            Ok(fresh) => fresh,
            Err(err) => {
                warn!("could not re-read preferences: {err}");
                return;
            }
        };

        let mut keys: Vec<&String> = seen.table.keys().chain(fresh.table.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            let before = seen.table.get(key).and_then(toml::Value::as_bool);
            let after = fresh.table.get(key).and_then(toml::Value::as_bool);
            if before != after {
                debug!(key = key.as_str(), ?after, "preference changed on disk");
                let _ = self.changes.send(StorageChange {
                    key: key.clone(),
                    new_value: after,
                });
            }
        }
        *seen = fresh;
    }
}

/// In-process store, for tests and embedding.
pub struct MemoryStore {
    values: Mutex<HashMap<String, bool>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<bool>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).copied())
    }

    fn set(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            new_value: Some(value),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
