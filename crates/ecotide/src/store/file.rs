use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{KeyValueStore, StoreError, StoreKey};

/// JSON document on disk holding every logical key. Reads go to disk each
/// time so separate processes sharing the file observe each other's writes.
/// Writes take an exclusive advisory lock on `<path>.lock`, re-read the
/// document, replace one key, and rename a uniquely named temporary file into
/// place, so concurrent writers to different keys never lose each other's
/// updates.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| io_error(&path, source))?;
        }

        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");
        let store = Self {
            lock_path: PathBuf::from(lock_name),
            path,
        };

        match store.read_document() {
            Ok(document) => {
                info!(path = %store.path.display(), keys = document.len(), "opened store");
            }
            Err(StoreError::Corrupt { .. }) => {
                warn!(path = %store.path.display(), "store document unreadable, treating as empty");
            }
            Err(err) => return Err(err),
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(io_error(&self.path, source)),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(source) => Err(StoreError::Corrupt {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock
            .write()
            .map_err(|source| io_error(&self.lock_path, source))?;

        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(StoreError::Corrupt { .. }) => {
                warn!(path = %self.path.display(), "overwriting unreadable store document");
                Map::new()
            }
            Err(err) => return Err(err),
        };
        change(&mut document);
        self.flush(&document)
    }

    fn flush(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec_pretty(document).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir).map_err(|source| io_error(dir, source))?;
        staged
            .write_all(&serialized)
            .map_err(|source| io_error(staged.path(), source))?;
        staged
            .persist(&self.path)
            .map(|_| ())
            .map_err(|err| io_error(&self.path, err.error))
    }

    fn open_lock_file(&self) -> Result<File, StoreError> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| io_error(&self.lock_path, source))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let document = self.read_document()?;
        Ok(document.get(key.as_str()).cloned())
    }

    fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.modify(|document| {
            document.insert(key.as_str().to_string(), value);
        })
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        self.modify(|document| {
            document.remove(key.as_str());
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
