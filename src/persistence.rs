// File: src/persistence.rs
use crate::error::StorageError;
use crate::storage::KeyValueStore;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// The on-disk form of the key space.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
struct Snapshot {
    entries: BTreeMap<String, String>,
}

/// A key-value store that survives restarts.
///
/// All entries are held in memory; every mutation rewrites the snapshot file
/// through a temp file in the same directory, so a crash mid-write leaves the
/// previous snapshot intact. A failed write is rolled back in memory too, so
/// memory and disk never disagree.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the snapshot at `path`. A missing or unreadable snapshot yields an
    /// empty store rather than an error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_from_disk(&path) {
            Ok(snapshot) => {
                info!(path = %path.display(), keys = snapshot.entries.len(), "loaded state snapshot");
                snapshot.entries
            }
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable state snapshot, starting empty");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<(), StorageError> {
        let snapshot = Snapshot {
            entries: self.entries.clone(),
        };
        save_to_disk(&snapshot, &self.path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let prior = self.entries.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            match prior {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let Some(prior) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), prior);
            return Err(e);
        }
        Ok(())
    }
}

fn save_to_disk(snapshot: &Snapshot, path: &Path) -> Result<(), StorageError> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        bincode::serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn load_from_disk(path: &Path) -> Result<Snapshot, StorageError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot = bincode::deserialize_from(reader)?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("state.bin"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_of_absent_key_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let mut store = FileStore::open(&path);
        store.remove("nothing").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("state.bin");
        let mut store = FileStore::open(&path);
        store.set("k", "v".to_string()).unwrap();
        assert!(path.exists());
    }
}
