//! # settings-repair
//!
//! One-shot repair for settings stores damaged by the 2.16 settings
//! migration, which could flip `is_private`, `force_i18n` and `amp` from
//! `"true"` to `"false"`. The 2.17 release fixed the migration; stores that
//! ran 2.16 without 2.17 are restored from their most recent backup.
//!
//! ## How it decides
//!
//! 1. Find the newest `ghost.<YYYY-MM-DD>.json` in `<content>/data`
//! 2. Read its `data.settings` and `data.migrations` arrays
//! 3. The store is affected iff the history has `2.16` and not `2.17`
//! 4. For each eligible key, a live `"false"` with a backup `"true"` is
//!    rewritten to `"true"`; nothing else is ever touched
//!
//! Any negative answer along the way ends the run without writes. Every
//! write happens in one transaction and is mirrored into the process
//! settings cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use settings_repair::{
//!     JsonFileSettingsStore, RepairConfig, RunOptions, SettingsCacheMirror, SettingsRepair,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> settings_repair::Result<()> {
//! let config = RepairConfig::builder()
//!     .content_path("~/blog/content")
//!     .content_path_from_env("BLOG_CONTENT_PATH")
//!     .build();
//!
//! let store = JsonFileSettingsStore::new("/var/lib/blog/settings.json");
//! let cache = Arc::new(SettingsCacheMirror::new());
//! cache.populate(&store.load()?)?;
//!
//! let outcome = SettingsRepair::new(config, cache).run(&store, &RunOptions::internal())?;
//! if !outcome.is_noop() {
//!     println!("Reverted: {:?}", outcome.reverted());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod sync;

pub mod backup;
pub mod cache;
pub mod config;
pub mod repair;
pub mod storage;
pub mod store;

pub use backup::{
    BackupDocument, BackupFile, BackupLoad, MigrationRecord, RecordId, SettingRecord,
};
pub use cache::{CacheStrategy, CachedSetting, SettingsCache, SettingsCacheMirror};
pub use config::{AccessContext, RepairConfig, RepairConfigBuilder, RunOptions};
pub use error::{Error, Result};
pub use repair::{RepairOutcome, SettingsRepair, WriteInstruction};
pub use storage::{JsonStorage, StorageBackend};
pub use store::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore, SettingsTransaction};
