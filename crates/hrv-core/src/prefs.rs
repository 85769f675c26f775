//! Persisted key-value preference store
//!
//! Holds the device pairing, the user HRV thresholds and the notification
//! switch. Values are plain strings; callers parse them.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::{HrvError, HrvResult};

/// Identity of the paired wearable
pub const DEVICE_ID_KEY: &str = "device_id";
/// User lower HRV threshold
pub const LOWER_HRV_KEY: &str = "lower_hrv";
/// User upper HRV threshold
pub const UPPER_HRV_KEY: &str = "upper_hrv";
/// Notification switch ("true" enables delivery)
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Process-wide persisted key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> HrvResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> HrvResult<()>;

    fn remove(&self, key: &str) -> HrvResult<()>;
}

/// Volatile store, used in tests and as a fallback
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.entries.write();
            for (key, value) in entries {
                map.insert(key.to_string(), value.to_string());
            }
        }
        store
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> HrvResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> HrvResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> HrvResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileKeyValueStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> HrvResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                HrvError::StorageFailure(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(HrvError::StorageFailure(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(JsonFileKeyValueStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> HrvResult<()> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| HrvError::StorageFailure(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| HrvError::StorageFailure(e.to_string()))?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text).map_err(|e| HrvError::StorageFailure(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| HrvError::StorageFailure(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileKeyValueStore {
    fn get(&self, key: &str) -> HrvResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> HrvResult<()> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> HrvResult<()> {
        let mut entries = self.entries.lock();
        if let Some(old) = entries.remove(key) {
            if let Err(e) = self.persist(&entries) {
                entries.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }
}
