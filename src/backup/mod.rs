//! Backup discovery and parsing

mod document;
mod locator;
mod types;

pub use document::{BackupLoad, load_backup, parse_backup};
pub use locator::{locate_latest, parse_backup_date, select_latest};
pub use types::{BackupDocument, BackupFile, MigrationRecord, RecordId, SettingRecord};

pub(crate) use types::timestamp;
