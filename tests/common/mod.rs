//! Common test utilities for settings-repair integration tests
//!
//! Provides a content directory with backups, a live store, a cache mirror
//! and stores that fail on demand.

#![allow(dead_code)]

use serde_json::{Value, json};
use settings_repair::{
    AccessContext, Error, MemorySettingsStore, RepairConfig, Result, SettingRecord,
    SettingsCacheMirror, SettingsRepair, SettingsStore, SettingsTransaction,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;

/// Fixed "now" handed to the repair
pub const NOW: OffsetDateTime = datetime!(2018-12-05 14:20:31.456 UTC);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Backup Builders
// =============================================================================

/// Backup body with the given settings and migration versions
pub fn backup_json(settings: &[(&str, &str)], versions: &[&str]) -> Value {
    let settings: Vec<Value> = settings
        .iter()
        .map(|(key, value)| json!({"key": key, "value": value, "type": "blog"}))
        .collect();
    let migrations: Vec<Value> = versions
        .iter()
        .map(|version| json!({"name": "1-migration.js", "version": version}))
        .collect();

    json!({
        "meta": {"exported_on": 1543622400000u64, "version": "2.16.4"},
        "data": {"settings": settings, "migrations": migrations}
    })
}

/// Backup written before 2.17 ran, with all three eligible keys `"true"`
pub fn affected_backup() -> Value {
    backup_json(
        &[
            ("title", "My Blog"),
            ("is_private", "true"),
            ("force_i18n", "true"),
            ("amp", "true"),
        ],
        &["1.0", "2.15", "2.16"],
    )
}

/// A live row with realistic audit fields
pub fn live_row(id: &str, key: &str, value: &str) -> SettingRecord {
    SettingRecord::new(key, value)
        .id(id)
        .kind("blog")
        .created(datetime!(2017-03-01 08:00:00.250 UTC), "1")
        .updated(datetime!(2018-11-20 10:00:00 UTC), "1")
}

/// Live table after the defective migration flipped every eligible key
pub fn corrupted_rows() -> Vec<SettingRecord> {
    vec![
        live_row("s1", "title", "My Blog"),
        live_row("s2", "is_private", "false"),
        live_row("s3", "force_i18n", "false"),
        live_row("s4", "amp", "false"),
    ]
}

// =============================================================================
// Test Fixture
// =============================================================================

pub struct RepairFixture {
    pub temp_dir: TempDir,
    pub cache: Arc<SettingsCacheMirror>,
}

impl RepairFixture {
    pub fn new() -> Self {
        init_logging();
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("data")).expect("Failed to create data dir");

        Self {
            temp_dir,
            cache: Arc::new(SettingsCacheMirror::new()),
        }
    }

    pub fn content_path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn data_path(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// Write `body` as `data/<name>`
    pub fn write_backup(&self, name: &str, body: &Value) -> PathBuf {
        let path = self.data_path().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(body).unwrap())
            .expect("Failed to write backup");
        path
    }

    pub fn write_raw_backup(&self, name: &str, content: &str) -> PathBuf {
        let path = self.data_path().join(name);
        std::fs::write(&path, content).expect("Failed to write backup");
        path
    }

    pub fn repair(&self) -> SettingsRepair {
        let config = RepairConfig::builder()
            .content_path(self.content_path())
            .build();
        SettingsRepair::new(config, self.cache.clone()).with_clock(|| NOW)
    }

    /// Store holding `rows`, with the cache seeded from the same rows
    pub fn store(&self, rows: Vec<SettingRecord>) -> MemorySettingsStore {
        self.cache.populate(&rows).expect("Failed to populate cache");
        MemorySettingsStore::new(rows)
    }
}

impl Default for RepairFixture {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Failing Stores
// =============================================================================

/// Store whose updates fail for one key and/or whose commit fails
pub struct FailingStore {
    pub inner: MemorySettingsStore,
    pub fail_update_on: Option<String>,
    pub fail_commit: bool,
}

impl FailingStore {
    pub fn failing_update(rows: Vec<SettingRecord>, key: &str) -> Self {
        Self {
            inner: MemorySettingsStore::new(rows),
            fail_update_on: Some(key.to_string()),
            fail_commit: false,
        }
    }

    pub fn failing_commit(rows: Vec<SettingRecord>) -> Self {
        Self {
            inner: MemorySettingsStore::new(rows),
            fail_update_on: None,
            fail_commit: true,
        }
    }
}

impl SettingsStore for FailingStore {
    fn begin(&self, access: &AccessContext) -> Result<Box<dyn SettingsTransaction + '_>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin(access)?,
            fail_update_on: self.fail_update_on.clone(),
            fail_commit: self.fail_commit,
        }))
    }
}

struct FailingTransaction<'a> {
    inner: Box<dyn SettingsTransaction + 'a>,
    fail_update_on: Option<String>,
    fail_commit: bool,
}

impl SettingsTransaction for FailingTransaction<'_> {
    fn read_all(&self) -> Result<Vec<SettingRecord>> {
        self.inner.read_all()
    }

    fn update_value(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_update_on.as_deref() == Some(key) {
            return Err(Error::Store(format!("update of '{key}' failed")));
        }
        self.inner.update_value(key, value)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if self.fail_commit {
            self.inner.rollback();
            return Err(Error::Store("commit failed".into()));
        }
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) {
        self.inner.rollback();
    }
}
