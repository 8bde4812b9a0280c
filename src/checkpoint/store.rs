use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

/// Where model artifacts live.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub model_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            model_dir: PathBuf::from("models"),
        }
    }
}

impl StorageConfig {
    pub fn open(&self) -> FileModelStore {
        FileModelStore::new(&self.model_dir)
    }
}

/// Keyed byte storage for weight blobs, metadata and progress logs.
pub trait ModelStore {
    /// Bytes stored under `key`, or `None` if nothing is stored there.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace whatever is stored under `key`.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Append one line of text to the log stored under `key`.
    fn append_log(&self, key: &str, line: &str) -> Result<(), StoreError>;
}

/// A directory of files, one per key. Writes go through a temp file and a
/// rename so a crash never leaves a half-written blob behind.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FileModelStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn io_error(path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl ModelStore for FileModelStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let final_path = self.path(key);
        let tmp_path = self.path(&format!("{}.tmp", key));

        fs::write(&tmp_path, bytes).map_err(|e| Self::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| Self::io_error(&final_path, e))?;
        Ok(())
    }

    fn append_log(&self, key: &str, line: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.path(key);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Self::io_error(&path, e))?;
        writeln!(file, "{}", line).map_err(|e| Self::io_error(&path, e))
    }
}

/// In-process store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }
}

impl ModelStore for MemoryModelStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn append_log(&self, key: &str, line: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        let log = entries.entry(key.to_string()).or_default();
        log.extend_from_slice(line.as_bytes());
        log.push(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_write_read() {
        let dir = tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models"));
        assert_eq!(store.read("policy_network.bin").unwrap(), None);

        store.write("policy_network.bin", &[1, 2, 3]).unwrap();
        assert_eq!(store.read("policy_network.bin").unwrap(), Some(vec![1, 2, 3]));
        assert!(!dir.path().join("models/policy_network.bin.tmp").exists());

        store.write("policy_network.bin", &[9]).unwrap();
        assert_eq!(store.read("policy_network.bin").unwrap(), Some(vec![9]));
    }

    #[test]
    fn test_file_store_append_log() {
        let dir = tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        store.append_log("training_log.txt", "first").unwrap();
        store.append_log("training_log.txt", "second").unwrap();
        let text = fs::read_to_string(dir.path().join("training_log.txt")).unwrap();
        assert_eq!(text, "first\nsecond\n");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryModelStore::new();
        assert!(!store.contains("a"));
        store.write("a", b"xyz").unwrap();
        assert!(store.contains("a"));
        assert_eq!(store.read("a").unwrap().as_deref(), Some(&b"xyz"[..]));
        store.append_log("log", "one").unwrap();
        store.append_log("log", "two").unwrap();
        assert_eq!(store.read("log").unwrap().unwrap(), b"one\ntwo\n");
    }
}
