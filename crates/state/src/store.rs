//! Atomic read-modify-write store for a single YAML document

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{StateError, StateLock, StateResult};

/// A document that can be kept in a [`StateStore`]
pub trait StateDocument: Serialize + DeserializeOwned {
    /// Checked after every load and before every write
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// One YAML document on disk, guarded by a sibling `.lock` file
#[derive(Debug, Clone)]
pub struct StateStore<T> {
    path: PathBuf,
    lock_path: PathBuf,
    _document: PhantomData<fn() -> T>,
}

impl<T: StateDocument> StateStore<T> {
    /// Create a store for the document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);

        Self {
            path,
            lock_path,
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read a snapshot of the document
    ///
    /// No lock is taken: files are only ever replaced by rename, so a reader
    /// sees either the previous or the next complete document.
    pub fn read(&self) -> StateResult<T> {
        if !self.path.exists() {
            return Err(StateError::Missing(self.path.clone()));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let document: T = serde_yaml::from_str(&content)?;
        self.check(&document)?;
        Ok(document)
    }

    /// Write a whole new document, creating the file if needed
    pub fn write(&self, document: &T) -> StateResult<()> {
        let _lock = StateLock::acquire(&self.lock_path)?;
        self.persist(document)
    }

    /// Read, mutate and atomically rewrite the document under the lock
    ///
    /// When `update` fails, or the document cannot be written, the file on
    /// disk is left exactly as it was.
    pub fn scoped_update<R, E, F>(&self, update: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StateError>,
    {
        let _lock = StateLock::acquire(&self.lock_path)?;
        let mut document = self.read()?;
        let result = update(&mut document)?;
        self.persist(&document)?;
        Ok(result)
    }

    fn check(&self, document: &T) -> StateResult<()> {
        document.validate().map_err(|reason| StateError::Invalid {
            path: self.path.clone(),
            reason,
        })
    }

    fn persist(&self, document: &T) -> StateResult<()> {
        self.check(document)?;
        let content = serde_yaml::to_string(document)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Wrote state file {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        names: Vec<String>,
    }

    impl StateDocument for Counter {
        fn validate(&self) -> Result<(), String> {
            if self.value > 1000 {
                return Err("counter overflow".to_string());
            }
            Ok(())
        }
    }

    fn store(dir: &TempDir) -> StateStore<Counter> {
        let store = StateStore::new(dir.path().join("counter.yml"));
        store.write(&Counter::default()).unwrap();
        store
    }

    #[test]
    fn test_read_missing() {
        let dir = TempDir::new().unwrap();
        let store: StateStore<Counter> = StateStore::new(dir.path().join("absent.yml"));
        assert!(!store.exists());
        assert!(matches!(store.read(), Err(StateError::Missing(_))));
    }

    #[test]
    fn test_scoped_update_persists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let value = store
            .scoped_update(|counter| -> StateResult<u32> {
                counter.value += 1;
                counter.names.push("first".to_string());
                Ok(counter.value)
            })
            .unwrap();

        assert_eq!(value, 1);
        let counter = store.read().unwrap();
        assert_eq!(counter.value, 1);
        assert_eq!(counter.names, vec!["first"]);
        assert!(dir.path().join("counter.yml.lock").exists());
    }

    #[test]
    fn test_failed_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let before = std::fs::read_to_string(store.path()).unwrap();

        let result = store.scoped_update(|counter| -> StateResult<()> {
            counter.value = 99;
            Err(StateError::Invalid {
                path: PathBuf::from("counter.yml"),
                reason: "rejected".to_string(),
            })
        });
        assert!(result.is_err());

        let invalid = store.scoped_update(|counter| -> StateResult<()> {
            counter.value = 5000;
            Ok(())
        });
        assert!(matches!(invalid, Err(StateError::Invalid { .. })));

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store(&dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .scoped_update(|counter| -> StateResult<()> {
                                counter.value += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read().unwrap().value, 200);
    }

    #[test]
    fn test_try_acquire_reports_contention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("busy.lock");

        let held = StateLock::acquire(&path).unwrap();
        assert!(StateLock::try_acquire(&path).unwrap().is_none());
        drop(held);
        assert!(StateLock::try_acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_try_acquire_surfaces_io_errors() {
        let dir = TempDir::new().unwrap();

        // a directory cannot be opened as a lock file
        assert!(StateLock::try_acquire(dir.path()).is_err());

        let nested = dir.path().join("nested").join("state.lock");
        assert!(StateLock::try_acquire(&nested).unwrap().is_some());
    }
}
