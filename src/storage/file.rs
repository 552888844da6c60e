//! File-backed key/value store.
//!
//! Each key is stored as `<state_dir>/<key>.json`. Every write goes to its
//! own uniquely named temporary file in the same directory and is renamed
//! into place, so readers only ever see complete values, even with several
//! processes writing the same key.

use super::KeyValueStore;
use crate::error::{AnoniumError, Result};
use crate::validation::Validator;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension used for stored values
const VALUE_EXTENSION: &str = "json";

/// [`KeyValueStore`] keeping one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Base directory for stored values
    base_dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).map_err(|e| {
                AnoniumError::storage(format!(
                    "Failed to create state directory {:?}: {}",
                    base_dir, e
                ))
            })?;
            info!("Created state directory: {:?}", base_dir);
        }

        Ok(Self { base_dir })
    }

    /// Returns the directory this store writes to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Gets the file path for a key
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        Validator::validate_storage_key(key)?;
        Ok(self.base_dir.join(format!("{}.{}", key, VALUE_EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AnoniumError::storage(format!(
                "Failed to read {:?}: {}",
                path, e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir).map_err(|e| {
            AnoniumError::storage(format!("Failed to create temp file in {:?}: {}", self.base_dir, e))
        })?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| AnoniumError::storage(format!("Failed to write {:?}: {}", tmp.path(), e)))?;
        tmp.persist(&path)
            .map_err(|e| AnoniumError::storage(format!("Failed to replace {:?}: {}", path, e)))?;

        debug!(key = key, bytes = value.len(), "file store: wrote value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = key, "file store: removed value");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AnoniumError::storage(format!(
                "Failed to delete {:?}: {}",
                path, e
            ))),
        }
    }
}
