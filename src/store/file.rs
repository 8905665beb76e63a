//! Settings table persisted as a JSON array of rows

use super::{SettingsStore, SettingsTransaction, authorize};
use crate::backup::SettingRecord;
use crate::config::AccessContext;
use crate::error::{Error, Result};
use crate::storage::{JsonStorage, StorageBackend};
use log::{debug, info};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File-backed settings table
///
/// A transaction reads the file once, stages writes in memory and rewrites
/// the file atomically on commit. A missing file is an empty table.
///
/// Rows are kept as stored: a write replaces only the `value` field of its
/// row, so columns this crate does not model and untouched rows survive a
/// commit unchanged.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore<S: StorageBackend = JsonStorage> {
    path: PathBuf,
    storage: S,
}

impl JsonFileSettingsStore<JsonStorage> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_storage(path, JsonStorage::new())
    }
}

impl<S: StorageBackend> JsonFileSettingsStore<S> {
    pub fn with_storage(path: impl Into<PathBuf>, storage: S) -> Self {
        Self {
            path: path.into(),
            storage,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row from disk
    ///
    /// Entries without a string `key` are not settings rows and are left out.
    pub fn load(&self) -> Result<Vec<SettingRecord>> {
        Ok(self
            .load_raw()?
            .iter()
            .filter_map(SettingRecord::from_json)
            .collect())
    }

    /// Overwrite the file with `rows`
    pub fn save(&self, rows: &[SettingRecord]) -> Result<()> {
        self.storage.write(&self.path, &rows)
    }

    fn load_raw(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            debug!("Settings file {} missing, treating as empty", self.path.display());
            return Ok(Vec::new());
        }
        self.storage.read(&self.path).map_err(|e| match e {
            Error::Serialize(e) => Error::Parse(format!("{}: {e}", self.path.display())),
            other => other,
        })
    }
}

impl<S: StorageBackend> SettingsStore for JsonFileSettingsStore<S> {
    fn begin(&self, access: &AccessContext) -> Result<Box<dyn SettingsTransaction + '_>> {
        authorize(access)?;
        Ok(Box::new(FileTransaction {
            store: self,
            rows: self.load_raw()?,
            dirty: false,
        }))
    }
}

struct FileTransaction<'a, S: StorageBackend> {
    store: &'a JsonFileSettingsStore<S>,
    rows: Vec<Value>,
    dirty: bool,
}

impl<S: StorageBackend> SettingsTransaction for FileTransaction<'_, S> {
    fn read_all(&self) -> Result<Vec<SettingRecord>> {
        Ok(self.rows.iter().filter_map(SettingRecord::from_json).collect())
    }

    fn update_value(&mut self, key: &str, value: &str) -> Result<()> {
        let row = self
            .rows
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|row| row.get("key").and_then(Value::as_str) == Some(key))
            .ok_or_else(|| Error::SettingNotFound(key.to_string()))?;
        row.insert("value".to_string(), Value::String(value.to_string()));
        self.dirty = true;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.store.storage.write(&self.store.path, &self.rows)?;
        info!("Settings written to {}", self.store.path.display());
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!(
            "Discarded staged settings for {}",
            self.store.path.display()
        );
    }
}
