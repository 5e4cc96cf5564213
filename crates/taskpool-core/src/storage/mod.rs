//! Local persistence: a small key-value port plus file and memory
//! backends. The sync engine and config store only ever see the port, so
//! hosts decide where state actually lives.

mod config;

pub use config::{SyncConfigStore, SyncSettings, SyncState, CONFIG_KEY};

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// Key under which the last successful sync instant is persisted.
pub const LAST_SYNC_KEY: &str = "taskpool_last_sync";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value persistence port.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read a JSON value stored under `key`, tolerating absence and
/// corruption by falling back to the given default.
pub(crate) fn get_json_or<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
    fallback: impl FnOnce() -> T,
) -> T {
    match store.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(key, error = %err, "stored value is corrupt, using defaults");
            fallback()
        }),
        Ok(None) => fallback(),
        Err(err) => {
            warn!(key, error = %err, "could not read stored value, using defaults");
            fallback()
        }
    }
}

/// Returns `~/.config/taskpool[-dev]/` based on TASKPOOL_ENV.
///
/// Set TASKPOOL_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TASKPOOL_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("taskpool-dev")
    } else {
        base_dir.join("taskpool")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Key-value store persisted as one JSON object file. The whole map is
/// loaded on open and the file rewritten on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store at `path`, starting empty if the file is missing.
    /// A corrupt file is logged and treated as empty rather than fatal.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "store file corrupt, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Open the default store file under the data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::open(data_dir()?.join("store.json")))
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
