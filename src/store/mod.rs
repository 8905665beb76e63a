//! Live settings store interface
//!
//! The host owns the settings table; the repair only needs to read every row
//! and rewrite a value by key, all inside one transaction. Two
//! implementations ship with the crate:
//!
//! - [`MemorySettingsStore`] - in-process table, useful for embedding and tests
//! - [`JsonFileSettingsStore`] - table persisted as a JSON array of rows

mod file;
mod memory;

pub use file::JsonFileSettingsStore;
pub use memory::MemorySettingsStore;

use crate::backup::SettingRecord;
use crate::config::AccessContext;
use crate::error::{Error, Result};

/// A transactional settings table
pub trait SettingsStore: Send + Sync {
    /// Open a transaction on behalf of `access`
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if `access` may not modify
    /// settings, or a store error if the table cannot be read.
    fn begin(&self, access: &AccessContext) -> Result<Box<dyn SettingsTransaction + '_>>;
}

/// Writes made through a transaction are invisible outside it until
/// [`commit`](SettingsTransaction::commit). Dropping a transaction without
/// committing discards them.
pub trait SettingsTransaction {
    /// All rows as currently seen by this transaction
    fn read_all(&self) -> Result<Vec<SettingRecord>>;

    /// Replace the value of the row identified by `key`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SettingNotFound`] if no row has that key.
    fn update_value(&mut self, key: &str, value: &str) -> Result<()>;

    /// Make every staged write visible
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every staged write
    fn rollback(self: Box<Self>);
}

/// Only the host itself may rewrite settings rows
pub(crate) fn authorize(access: &AccessContext) -> Result<()> {
    match access {
        AccessContext::Internal => Ok(()),
        AccessContext::User(id) => Err(Error::PermissionDenied(format!(
            "user '{id}' cannot modify settings directly"
        ))),
    }
}

/// Copy of the table that a transaction mutates before commit
#[derive(Debug, Clone, Default)]
pub(crate) struct StagedRows {
    rows: Vec<SettingRecord>,
    dirty: bool,
}

impl StagedRows {
    pub(crate) fn new(rows: Vec<SettingRecord>) -> Self {
        Self { rows, dirty: false }
    }

    pub(crate) fn rows(&self) -> &[SettingRecord] {
        &self.rows
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn into_rows(self) -> Vec<SettingRecord> {
        self.rows
    }

    pub(crate) fn update_value(&mut self, key: &str, value: &str) -> Result<()> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.key == key)
            .ok_or_else(|| Error::SettingNotFound(key.to_string()))?;
        row.value = Some(value.to_string());
        self.dirty = true;
        Ok(())
    }
}
