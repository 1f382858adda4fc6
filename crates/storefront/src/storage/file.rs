//! JSON-file storage.
//!
//! The whole map lives in one JSON object on disk. Every operation re-reads
//! the file, so several processes pointed at the same path behave like tabs
//! sharing browser storage: each write replaces the file atomically (temp
//! file + rename) and the last writer wins.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Storage, StorageError};

/// A [`Storage`] persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Use the file at `path`. The file and its directory are created lazily.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full map.
    ///
    /// A missing file is an empty map. An unreadable or corrupt file is also
    /// treated as empty and is replaced by the next write.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read storage file");
                return HashMap::new();
            }
        };
        if raw.trim().is_empty() {
            return HashMap::new();
        }
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Storage file is corrupt, treating as empty");
            HashMap::new()
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let body = serde_json::to_vec_pretty(entries)?;
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "storage".into(), |n| n.to_string_lossy().into_owned());
        let tmp = dir.join(format!(".{file_name}.{}.tmp", std::process::id()));
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut HashMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let mut entries = self.snapshot();
        if apply(&mut entries) {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.snapshot().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("local.json"));
        assert!(storage.snapshot().is_empty());
        assert_eq!(storage.get("token"), None);
    }

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("local.json"));
        storage.set("token", "abc").unwrap();
        assert_eq!(storage.get("token").as_deref(), Some("abc"));
        storage.remove("token").unwrap();
        assert_eq!(storage.get("token"), None);
    }

    #[test]
    fn test_two_handles_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        let a = FileStorage::new(&path);
        let b = FileStorage::new(&path);
        a.set("lc_cart", "[]").unwrap();
        assert_eq!(b.get("lc_cart").as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_file_heals_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        std::fs::write(&path, "{oops").unwrap();
        let storage = FileStorage::new(&path);
        assert!(storage.snapshot().is_empty());
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").as_deref(), Some("v"));
    }
}
