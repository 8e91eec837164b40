//! File storage abstraction for extracted media.
//!
//! The parser only needs "save these bytes somewhere and give me back a
//! name"; where the bytes land (local disk, object store, test buffer) is
//! the caller's concern.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use docstruct_core::{DocStructError, Result};
use uuid::Uuid;

/// Sink for extracted media bytes.
///
/// Implementations must be safe to call from multiple parses at once.
pub trait FileStorage: Send + Sync {
    /// Persist `bytes` under the logical directory `dir`, using a fresh
    /// name with the given extension (including the leading dot).
    ///
    /// Returns the stored file's name, suitable for embedding in element
    /// data.
    fn save(&self, dir: &str, bytes: &[u8], extension: &str) -> Result<String>;
}

/// Stores media under a base directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base: PathBuf,
}

impl LocalStorage {
    /// Create a storage rooted at `base`
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl FileStorage for LocalStorage {
    fn save(&self, dir: &str, bytes: &[u8], extension: &str) -> Result<String> {
        let name = format!("{}{extension}", Uuid::new_v4());
        let target_dir = self.base.join(dir);
        fs::create_dir_all(&target_dir)?;
        fs::write(target_dir.join(&name), bytes)?;
        Ok(name)
    }
}

/// One file captured by [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub dir: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// In-memory storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<Vec<SavedFile>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything saved so far
    #[must_use]
    pub fn files(&self) -> Vec<SavedFile> {
        match self.files.lock() {
            Ok(files) => files.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl FileStorage for MemoryStorage {
    fn save(&self, dir: &str, bytes: &[u8], extension: &str) -> Result<String> {
        let name = format!("{}{extension}", Uuid::new_v4());
        let mut files = self
            .files
            .lock()
            .map_err(|_| DocStructError::Storage("storage lock poisoned".to_string()))?;
        files.push(SavedFile {
            dir: dir.to_string(),
            name: name.clone(),
            bytes: bytes.to_vec(),
        });
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_storage_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let name = storage.save("images", b"abc", ".png").unwrap();
        assert!(name.ends_with(".png"));
        let data = fs::read(tmp.path().join("images").join(&name)).unwrap();
        assert_eq!(data, b"abc");
    }

    #[test]
    fn test_memory_storage_records_saves() {
        let storage = MemoryStorage::new();
        let name = storage.save("media", b"xyz", ".jpeg").unwrap();
        let files = storage.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].dir, "media");
        assert_eq!(files[0].name, name);
        assert_eq!(files[0].bytes, b"xyz");
    }

    #[test]
    fn test_names_are_unique() {
        let storage = MemoryStorage::new();
        let a = storage.save("m", b"1", ".png").unwrap();
        let b = storage.save("m", b"2", ".png").unwrap();
        assert_ne!(a, b);
    }
}
