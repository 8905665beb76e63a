//! In-memory settings table

use super::{SettingsStore, SettingsTransaction, StagedRows, authorize};
use crate::backup::SettingRecord;
use crate::config::AccessContext;
use crate::error::Result;
use crate::sync::RwLockExt;
use log::debug;
use std::sync::RwLock;

/// Settings table held in process memory
///
/// Each transaction works on its own copy of the rows; commit replaces the
/// table wholesale, so with overlapping transactions the last commit wins.
pub struct MemorySettingsStore {
    rows: RwLock<Vec<SettingRecord>>,
}

impl MemorySettingsStore {
    pub fn new(rows: Vec<SettingRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Current committed rows
    pub fn snapshot(&self) -> Result<Vec<SettingRecord>> {
        Ok(self.rows.read_recovered()?.clone())
    }

    /// Committed row for `key`, if any
    pub fn get(&self, key: &str) -> Result<Option<SettingRecord>> {
        Ok(self
            .rows
            .read_recovered()?
            .iter()
            .find(|row| row.key == key)
            .cloned())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn begin(&self, access: &AccessContext) -> Result<Box<dyn SettingsTransaction + '_>> {
        authorize(access)?;
        Ok(Box::new(MemoryTransaction {
            store: self,
            staged: StagedRows::new(self.snapshot()?),
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemorySettingsStore,
    staged: StagedRows,
}

impl SettingsTransaction for MemoryTransaction<'_> {
    fn read_all(&self) -> Result<Vec<SettingRecord>> {
        Ok(self.staged.rows().to_vec())
    }

    fn update_value(&mut self, key: &str, value: &str) -> Result<()> {
        self.staged.update_value(key, value)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { store, staged } = *self;
        if !staged.is_dirty() {
            return Ok(());
        }
        let mut rows = store.rows.write_recovered()?;
        *rows = staged.into_rows();
        debug!("Committed settings transaction");
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!("Rolled back settings transaction");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store() -> MemorySettingsStore {
        MemorySettingsStore::new(vec![
            SettingRecord::new("is_private", "false"),
            SettingRecord::new("amp", "true"),
        ])
    }

    #[test]
    fn test_commit_applies_staged_writes() {
        let store = store();
        let mut tx = store.begin(&AccessContext::internal()).unwrap();
        tx.update_value("is_private", "true").unwrap();

        assert!(store.get("is_private").unwrap().unwrap().value_is("false"));
        assert!(tx.read_all().unwrap()[0].value_is("true"));

        tx.commit().unwrap();
        assert!(store.get("is_private").unwrap().unwrap().value_is("true"));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let store = store();
        let mut tx = store.begin(&AccessContext::internal()).unwrap();
        tx.update_value("is_private", "true").unwrap();
        tx.rollback();

        assert!(store.get("is_private").unwrap().unwrap().value_is("false"));
    }

    #[test]
    fn test_user_context_rejected() {
        let store = store();
        let result = store.begin(&AccessContext::user("author"));
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }
}
