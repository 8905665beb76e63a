//! Loads a backup export into a [`BackupDocument`]
//!
//! A backup that cannot be used never fails the run: every problem maps to
//! one of the non-loaded [`BackupLoad`] variants.

use super::types::{BackupDocument, MigrationRecord, SettingRecord};
use crate::storage::StorageBackend;
use log::debug;
use serde_json::Value;
use std::path::Path;

/// Result of reading a backup file
#[derive(Debug, Clone, PartialEq)]
pub enum BackupLoad {
    /// Settings and a non-empty migration history were found
    Loaded(BackupDocument),
    /// The file, its JSON, or its `data.settings` array could not be read
    SettingsUnreadable { reason: String },
    /// `data.migrations` is missing, malformed or has no usable entries
    NoHistory,
}

/// Read and parse the backup at `path`
pub fn load_backup<S: StorageBackend>(storage: &S, path: &Path) -> BackupLoad {
    match storage.read_to_string(path) {
        Ok(content) => parse_backup(storage, &content),
        Err(e) => BackupLoad::SettingsUnreadable {
            reason: e.to_string(),
        },
    }
}

/// Parse backup content of the form `{"data": {"settings": [...], "migrations": [...]}}`
pub fn parse_backup<S: StorageBackend>(storage: &S, content: &str) -> BackupLoad {
    let root: Value = match storage.deserialize(content) {
        Ok(root) => root,
        Err(e) => {
            return BackupLoad::SettingsUnreadable {
                reason: e.to_string(),
            };
        }
    };
    let data = root.get("data");

    let settings = match data.and_then(|d| d.get("settings")) {
        None | Some(Value::Null) => {
            return BackupLoad::SettingsUnreadable {
                reason: "no data.settings in backup".into(),
            };
        }
        Some(Value::Array(rows)) => rows
            .iter()
            .filter_map(|row| {
                let record = SettingRecord::from_json(row);
                if record.is_none() {
                    debug!("Skipping backup settings row without a key: {row}");
                }
                record
            })
            .collect::<Vec<_>>(),
        Some(other) => {
            return BackupLoad::SettingsUnreadable {
                reason: format!("invalid data.settings: expected an array, found {other}"),
            };
        }
    };

    let migrations: Vec<MigrationRecord> = match data.and_then(|d| d.get("migrations")) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                let record = MigrationRecord::from_json(entry);
                if record.is_none() {
                    debug!("Skipping migration entry without a version: {entry}");
                }
                record
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            debug!("Ignoring malformed data.migrations: {other}");
            Vec::new()
        }
    };

    if migrations.is_empty() {
        return BackupLoad::NoHistory;
    }

    BackupLoad::Loaded(BackupDocument {
        settings,
        migrations,
    })
}
