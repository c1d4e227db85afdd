//! Durable local key-value storage for the credential and custom commands.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;

use crate::observability::STORE_ERRORS;
use crate::{Error, Result};

/// Key holding the raw API key.
pub const CREDENTIAL_KEY: &str = "worm_api_key";

/// Key holding the JSON-serialized custom command list.
pub const COMMANDS_KEY: &str = "worm_commands";

const STORE_FILE: &str = "store.json";

/// A string-to-string store that survives process restarts.
pub trait KeyValueStore: Send {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// A store kept as one JSON object in a file, rewritten atomically on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Uses `dir/store.json`, creating `dir` on first write.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(STORE_FILE),
        }
    }

    /// Uses the platform configuration directory.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if no home directory can be determined.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "wormzero", "wormzero").ok_or_else(|| {
            Error::persistence("could not determine a configuration directory", None)
        })?;
        Ok(Self::in_dir(dirs.config_dir()))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                STORE_ERRORS.click();
                return Err(Error::persistence(
                    format!("failed to read {}", self.path.display()),
                    Some(Box::new(err)),
                ));
            }
        };
        serde_json::from_str(&contents).map_err(|err| {
            STORE_ERRORS.click();
            Error::persistence(
                format!("{} is not a valid store", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }

    /// Reads the current contents, discarding a corrupt file so that writes can proceed.
    fn read_for_update(&self) -> Result<BTreeMap<String, String>> {
        match self.read_all() {
            Ok(values) => Ok(values),
            Err(err @ Error::Persistence { .. }) if self.path.exists() => {
                tracing::warn!(error = %err, "replacing unreadable store");
                Ok(BTreeMap::new())
            }
            Err(err) => Err(err),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let write = || -> io::Result<()> {
            let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(dir)?;
            let mut file = NamedTempFile::new_in(dir)?;
            let json = serde_json::to_string_pretty(values)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
            file.persist(&self.path).map_err(|err| err.error)?;
            Ok(())
        };
        write().map_err(|err| {
            STORE_ERRORS.click();
            Error::persistence(
                format!("failed to write {}", self.path.display()),
                Some(Box::new(err)),
            )
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_for_update()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut values = self.read_for_update()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
        store.set(CREDENTIAL_KEY, "AIzaSy").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("AIzaSy"));
        store.remove(CREDENTIAL_KEY).unwrap();
        store.remove(CREDENTIAL_KEY).unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path().join("nested"));
        assert_eq!(store.get(COMMANDS_KEY).unwrap(), None);

        store.set(COMMANDS_KEY, "[]").unwrap();
        store.set(CREDENTIAL_KEY, "key").unwrap();

        let reopened = FileStore::in_dir(dir.path().join("nested"));
        assert_eq!(reopened.get(COMMANDS_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("key"));
    }

    #[test]
    fn corrupt_file_reports_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        assert!(store.get(CREDENTIAL_KEY).unwrap_err().is_persistence());

        store.set(CREDENTIAL_KEY, "fresh").unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn remove_missing_key_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::in_dir(dir.path());
        store.remove(CREDENTIAL_KEY).unwrap();
        assert!(!store.path().exists());
    }
}
