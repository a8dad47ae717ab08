//! Durable key-value persistence.
//!
//! Each persisted store owns one namespace, and a namespace holds a single
//! slot: the store's full serialized state. Stores must not share a
//! namespace; two stores writing the same slot overwrite each other.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),
}

/// A durable slot per namespace: read on startup, replaced wholesale on
/// every mutation.
pub trait Storage: Send + Sync {
    /// Read the slot for `namespace`, or `None` if it has never been written.
    fn read(&self, namespace: &str) -> Result<Option<String>, StorageError>;

    /// Replace the slot for `namespace` with `value`.
    ///
    /// The replacement is all-or-nothing: a failed write leaves the
    /// previously stored value readable.
    fn write(&self, namespace: &str, value: &str) -> Result<(), StorageError>;
}

/// File-backed storage: one file per namespace under a data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slot_path(&self, namespace: &str) -> Result<PathBuf, StorageError> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidNamespace(namespace.to_string()));
        }
        Ok(self.dir.join(format!("{namespace}.json")))
    }
}

impl Storage for FileStorage {
    fn read(&self, namespace: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(namespace)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, namespace: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(namespace)?;
        // Write into a temp file in the same directory, then rename over the
        // slot. An interrupted write never clobbers the previous snapshot.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, namespace: &str) -> Result<Option<String>, StorageError> {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(slots.get(namespace).cloned())
    }

    fn write(&self, namespace: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        slots.insert(namespace.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert!(storage.read("sessions").unwrap().is_none());

        storage.write("sessions", r#"{"version":1}"#).unwrap();
        assert_eq!(
            storage.read("sessions").unwrap().as_deref(),
            Some(r#"{"version":1}"#)
        );
    }

    #[test]
    fn test_file_overwrite_replaces() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.write("slot", "first").unwrap();
        storage.write("slot", "second").unwrap();
        assert_eq!(storage.read("slot").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.write("sessions", "a").unwrap();
        storage.write("drafts", "b").unwrap();

        assert_eq!(storage.read("sessions").unwrap().as_deref(), Some("a"));
        assert_eq!(storage.read("drafts").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert!(matches!(
            storage.write("", "x"),
            Err(StorageError::InvalidNamespace(_))
        ));
        assert!(matches!(
            storage.read("../escape"),
            Err(StorageError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_memory_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.read("sessions").unwrap().is_none());

        storage.write("sessions", "state").unwrap();
        assert_eq!(storage.read("sessions").unwrap().as_deref(), Some("state"));
    }
}
