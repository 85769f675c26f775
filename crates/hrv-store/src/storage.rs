//! Partition storage port
//!
//! The record store only needs three file-like operations on named text
//! partitions. Backends map them onto a directory or onto memory.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use hrv_core::{HrvError, HrvResult};

/// File-like storage of named text partitions
pub trait PartitionStorage: Send + Sync {
    /// Whole contents of a partition; `NotFound` if it does not exist
    fn read_all(&self, name: &str) -> HrvResult<String>;

    /// Append text to an existing partition
    fn append(&self, name: &str, text: &str) -> HrvResult<()>;

    /// Create a partition holding `text`
    fn write_new(&self, name: &str, text: &str) -> HrvResult<()>;
}

/// Partitions stored as files in one directory
#[derive(Debug, Clone)]
pub struct FsPartitionStorage {
    root: PathBuf,
}

impl FsPartitionStorage {
    /// The directory is created on the first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsPartitionStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> HrvResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(HrvError::StorageFailure(format!(
                "invalid partition name {:?}",
                name
            )));
        }
        Ok(self.root.join(name))
    }
}

fn io_failure(path: &Path, e: std::io::Error) -> HrvError {
    HrvError::StorageFailure(format!("{}: {}", path.display(), e))
}

impl PartitionStorage for FsPartitionStorage {
    fn read_all(&self, name: &str) -> HrvResult<String> {
        let path = self.path(name)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HrvError::NotFound(name.to_string()),
            _ => io_failure(&path, e),
        })
    }

    fn append(&self, name: &str, text: &str) -> HrvResult<()> {
        let path = self.path(name)?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => HrvError::NotFound(name.to_string()),
                _ => io_failure(&path, e),
            })?;
        file.write_all(text.as_bytes())
            .map_err(|e| io_failure(&path, e))
    }

    fn write_new(&self, name: &str, text: &str) -> HrvResult<()> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.root).map_err(|e| io_failure(&self.root, e))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| io_failure(&path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| io_failure(&path, e))
    }
}

/// Partitions held in memory
#[derive(Debug, Default)]
pub struct MemoryPartitionStorage {
    partitions: Mutex<BTreeMap<String, String>>,
}

impl MemoryPartitionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a partition's raw contents
    pub fn insert_raw(&self, name: &str, text: &str) {
        self.partitions
            .lock()
            .insert(name.to_string(), text.to_string());
    }

    pub fn contents(&self, name: &str) -> Option<String> {
        self.partitions.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.partitions.lock().keys().cloned().collect()
    }
}

impl PartitionStorage for MemoryPartitionStorage {
    fn read_all(&self, name: &str) -> HrvResult<String> {
        self.partitions
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| HrvError::NotFound(name.to_string()))
    }

    fn append(&self, name: &str, text: &str) -> HrvResult<()> {
        match self.partitions.lock().get_mut(name) {
            Some(contents) => {
                contents.push_str(text);
                Ok(())
            }
            None => Err(HrvError::NotFound(name.to_string())),
        }
    }

    fn write_new(&self, name: &str, text: &str) -> HrvResult<()> {
        let mut partitions = self.partitions.lock();
        if partitions.contains_key(name) {
            return Err(HrvError::StorageFailure(format!("{} already exists", name)));
        }
        partitions.insert(name.to_string(), text.to_string());
        Ok(())
    }
}
