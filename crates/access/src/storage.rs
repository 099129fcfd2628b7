//! Durable local storage for the session snapshot.
//!
//! Storage deals in raw text, keyed per device. Parsing belongs to the
//! session store, which is what decides that an unreadable payload means
//! "anonymous".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Storage key for the signed-in user, also used as the file stem.
pub const CURRENT_USER_KEY: &str = "current_user";

/// Errors that can occur reading or writing the durable copy.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("session storage I/O error at {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The stored payload is not text.
    #[error("session storage at {path} is not valid UTF-8")]
    Corrupt {
        /// File holding the payload.
        path: PathBuf,
    },
}

/// Durable, per-device storage for one serialized snapshot.
pub trait SnapshotStorage: Send + Sync {
    /// Read the stored payload, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload exists but cannot be read.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored payload.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the payload cannot be written.
    fn save(&self, payload: &str) -> Result<(), StorageError>;

    /// Remove the stored payload. Erasing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if an existing payload cannot be removed.
    fn erase(&self) -> Result<(), StorageError>;
}

/// Stores the snapshot as a JSON file inside a device directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`; the directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CURRENT_USER_KEY}.json")),
        }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(StorageError::Corrupt {
                path: self.path.clone(),
            }),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, payload: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        // Write then rename so a crash mid-write never leaves half a snapshot.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn erase(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(self.io_error(e)),
            _ => Ok(()),
        }
    }
}

/// In-process storage, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    payload: Mutex<Option<String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `payload`, as if left by a previous run.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(payload.into())),
        }
    }

    /// Current raw payload.
    #[must_use]
    pub fn payload(&self) -> Option<String> {
        self.payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.payload())
    }

    fn save(&self, payload: &str) -> Result<(), StorageError> {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.to_owned());
        Ok(())
    }

    fn erase(&self) -> Result<(), StorageError> {
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_file_storage_save_load_erase() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("device"));

        storage.save("{\"id\":1}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{\"id\":1}"));
        assert!(storage.path().ends_with("current_user.json"));

        storage.erase().unwrap();
        assert!(storage.load().unwrap().is_none());
        // Erasing twice is fine.
        storage.erase().unwrap();
    }

    #[test]
    fn test_file_storage_binary_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        fs::write(storage.path(), [0xff, 0xfe, 0x00]).unwrap();

        assert!(matches!(storage.load(), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::with_payload("x");
        assert_eq!(storage.load().unwrap().as_deref(), Some("x"));
        storage.save("y").unwrap();
        assert_eq!(storage.payload().as_deref(), Some("y"));
        storage.erase().unwrap();
        assert!(storage.payload().is_none());
    }
}
