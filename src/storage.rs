//! Key-value persistence.
//!
//! Every value is stored as a JSON document under a string key. The
//! [`Storage`] gateway contains all failures: reads fall back to a default and
//! writes report `false`, with the cause logged.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};

use crate::config::APP_KEYS;
use crate::error::{Error, Result};

/// Raw string store underneath the gateway.
pub trait KeyValueStore {
    /// Returns the stored text, or `None` when the key is absent.
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// Returns the file backing `key`.
    ///
    /// Keys are plain names; anything that could escape the data directory
    /// is rejected.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(Error::invalid_input(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        let mut f = match OpenOptions::new().read(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Some(s))
    }

    /// Writes via a temp file and rename so a crash never leaves a torn file.
    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        let result = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .and_then(|mut f| {
                f.write_all(value.as_bytes())?;
                f.flush()
            })
            .and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Single-threaded by construction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// JSON gateway over a [`KeyValueStore`].
#[derive(Debug)]
pub struct Storage<S> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(store: S) -> Self {
        Storage { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads and decodes the value under `key`.
    ///
    /// Returns `default` if the key is absent, empty, unreadable or does not
    /// parse.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.store.read(key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return default,
            Err(e) => {
                tracing::error!(target: "storage", "Failed to retrieve {}: {}", key, e);
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(target: "storage", "Failed to parse {}: {}", key, e);
                default
            }
        }
    }

    /// Encodes and stores `value` under `key`. Returns `false` on failure.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(Error::from)
            .and_then(|s| self.store.write(key, &s));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(target: "storage", "Failed to save {}: {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.store.delete(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(target: "storage", "Failed to remove {}: {}", key, e);
                false
            }
        }
    }

    /// Removes every application key. Keys owned by anyone else stay put.
    pub fn clear_all(&self) -> bool {
        let mut ok = true;
        for key in APP_KEYS {
            if let Err(e) = self.store.delete(key) {
                tracing::error!(target: "storage", "Failed to clear storage at {}: {}", key, e);
                ok = false;
            }
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TASKS_KEY, THEME_KEY};

    /// A store whose every operation fails.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied").into())
        }
        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(std::io::Error::new(ErrorKind::Other, "quota exceeded").into())
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied").into())
        }
    }

    #[test]
    fn test_get_returns_default_when_absent() {
        let storage = Storage::new(MemoryStore::new());
        let value: Vec<u32> = storage.get("missing", vec![7]);
        assert_eq!(value, vec![7]);
    }

    #[test]
    fn test_set_then_get() {
        let storage = Storage::new(MemoryStore::new());
        assert!(storage.set("numbers", &vec![1, 2, 3]));
        let value: Vec<u32> = storage.get("numbers", Vec::new());
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_get_returns_default_on_corrupt_json() {
        let store = MemoryStore::new();
        store.write("numbers", "{not json").unwrap();
        let storage = Storage::new(store);
        let value: Vec<u32> = storage.get("numbers", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn test_failures_are_contained() {
        let storage = Storage::new(BrokenStore);
        assert_eq!(storage.get("x", 5u32), 5);
        assert!(!storage.set("x", &1u32));
        assert!(!storage.remove("x"));
        assert!(!storage.clear_all());
    }

    #[test]
    fn test_clear_all_leaves_foreign_keys() {
        let storage = Storage::new(MemoryStore::new());
        storage.set(TASKS_KEY, &Vec::<u32>::new());
        storage.set(THEME_KEY, "dark");
        storage.set("someone_else", "keep me");

        assert!(storage.clear_all());
        assert_eq!(storage.store().len(), 1);
        assert_eq!(storage.get("someone_else", String::new()), "keep me");
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let store = FileStore::new("/tmp/unused");
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("tasks_v1").is_ok());
    }
}
