//! JSON file storage backend
//!
//! The whole key space lives in one JSON object on disk. It is loaded once at
//! open and rewritten on every mutation through a temp file plus rename, so a
//! crash leaves either the old or the new snapshot and never a torn file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use marginalia_common::{StorageBackend, StorageError, StorageResult};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// [`StorageBackend`] persisting to a single JSON file
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open `path`, creating parent directories when needed
    ///
    /// A missing file starts empty. An unreadable or corrupt file is an
    /// error rather than silently discarded state.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|err| {
                    StorageError::read_failed(path.display().to_string(), err.to_string())
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened file storage");
        Ok(Self { path, entries: RwLock::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, key: &str, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let encoded = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("tmp");
        let written = File::create(&tmp).and_then(|mut file| {
            file.write_all(&encoded)?;
            file.sync_all()
        });
        if let Err(err) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            warn!(path = %self.path.display(), error = %err, "Storage flush failed");
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::write_failed(key, err.to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.persist(key, &next)?;
        *entries = next;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(key, &next)?;
        *entries = next;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
