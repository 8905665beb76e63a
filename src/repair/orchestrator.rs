//! Runs the repair end to end

use super::detector::is_affected;
use super::reconcile::reconcile;
use crate::backup::{BackupLoad, SettingRecord, load_backup, locate_latest};
use crate::cache::{CachedSetting, SettingsCache, coerce_value, truncate_to_second};
use crate::config::{RepairConfig, RunOptions};
use crate::error::{Error, Result};
use crate::storage::{JsonStorage, StorageBackend};
use crate::store::{SettingsStore, SettingsTransaction};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

/// Source of "now" for refreshed `updated_at` stamps
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// How a repair run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// No `ghost.<date>.json` file in the data directory
    NoBackup,
    /// The newest backup could not be read or has no settings list
    SettingsUnreadable { backup: PathBuf, reason: String },
    /// The newest backup has no migration history
    NoHistory { backup: PathBuf },
    /// The history shows the store never ran the defective release alone
    NotAffected { backup: PathBuf },
    /// The store was affected; `reverted` lists the keys rewritten to `"true"`
    Repaired { backup: PathBuf, reverted: Vec<String> },
}

impl RepairOutcome {
    /// Keys rewritten by this run
    pub fn reverted(&self) -> &[String] {
        match self {
            Self::Repaired { reverted, .. } => reverted.as_slice(),
            _ => &[],
        }
    }

    /// True when the run wrote nothing
    pub fn is_noop(&self) -> bool {
        self.reverted().is_empty()
    }
}

/// Cache entries overwritten during a run, so a failed run can put them back
#[derive(Default)]
struct CacheJournal {
    previous: Vec<(String, Option<CachedSetting>)>,
}

impl CacheJournal {
    fn record(&mut self, cache: &dyn SettingsCache, key: &str) -> Result<()> {
        let before = cache.get(key)?;
        self.previous.push((key.to_string(), before));
        Ok(())
    }

    fn revert(self, cache: &dyn SettingsCache) {
        for (key, before) in self.previous.into_iter().rev() {
            let restored = match before {
                Some(entry) => cache.set(&key, entry),
                None => cache.remove(&key).map(|_| ()),
            };
            if let Err(e) = restored {
                warn!("Could not restore cache entry '{key}': {e}");
            }
        }
    }
}

/// Restores `is_private`, `force_i18n` and `amp` from the latest backup when
/// the store went through the defective release.
///
/// # Example
///
/// ```rust,no_run
/// use settings_repair::{
///     MemorySettingsStore, RepairConfig, RunOptions, SettingsCacheMirror, SettingsRepair,
/// };
/// use std::sync::Arc;
///
/// # fn example() -> settings_repair::Result<()> {
/// let config = RepairConfig::builder()
///     .content_path("/var/lib/blog/content")
///     .build();
/// let cache = Arc::new(SettingsCacheMirror::new());
/// let store = MemorySettingsStore::new(Vec::new());
///
/// let outcome = SettingsRepair::new(config, cache).run(&store, &RunOptions::internal())?;
/// println!("reverted: {:?}", outcome.reverted());
/// # Ok(())
/// # }
/// ```
pub struct SettingsRepair<S: StorageBackend = JsonStorage> {
    config: RepairConfig<S>,
    cache: Arc<dyn SettingsCache>,
    clock: Clock,
}

impl<S: StorageBackend> SettingsRepair<S> {
    pub fn new(config: RepairConfig<S>, cache: Arc<dyn SettingsCache>) -> Self {
        Self {
            config,
            cache,
            clock: Arc::new(OffsetDateTime::now_utc),
        }
    }

    /// Replace the clock used for `updated_at`
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> OffsetDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &RepairConfig<S> {
        &self.config
    }

    /// Run the repair in its own transaction on `store`
    ///
    /// Commits if every write succeeds. On any failure the transaction is
    /// rolled back and cache entries touched by this run are restored.
    ///
    /// # Errors
    ///
    /// Fails if the backup directory cannot be listed, the access context is
    /// rejected, or the store fails to read, update or commit.
    pub fn run(&self, store: &dyn SettingsStore, options: &RunOptions) -> Result<RepairOutcome> {
        let mut tx = store.begin(&options.access)?;
        let mut journal = CacheJournal::default();

        match self.repair(tx.as_mut(), &mut journal) {
            Ok(outcome) => match tx.commit() {
                Ok(()) => Ok(outcome),
                Err(e) => {
                    warn!("Commit failed, restoring settings cache: {e}");
                    journal.revert(self.cache.as_ref());
                    Err(e)
                }
            },
            Err(e) => {
                warn!("Repair failed, rolling back: {e}");
                tx.rollback();
                journal.revert(self.cache.as_ref());
                Err(e)
            }
        }
    }

    /// Run the repair inside a transaction owned by the caller
    ///
    /// The caller decides whether to commit. If this returns an error, cache
    /// entries touched by the run have already been restored and the caller
    /// must roll back.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run), minus commit failures.
    pub fn run_in(&self, tx: &mut dyn SettingsTransaction) -> Result<RepairOutcome> {
        let mut journal = CacheJournal::default();
        self.repair(tx, &mut journal).inspect_err(|_| {
            journal.revert(self.cache.as_ref());
        })
    }

    fn repair(
        &self,
        tx: &mut dyn SettingsTransaction,
        journal: &mut CacheJournal,
    ) -> Result<RepairOutcome> {
        let data_path = self.config.data_path();

        let Some(latest) = locate_latest(&data_path)? else {
            warn!("No backup files found in {}, skipping", data_path.display());
            return Ok(RepairOutcome::NoBackup);
        };
        let backup = latest.path;
        info!("Using backup file {}", backup.display());

        let document = match load_backup(&self.config.storage, &backup) {
            BackupLoad::Loaded(document) => document,
            BackupLoad::SettingsUnreadable { reason } => {
                warn!("Could not read settings from backup file ({reason}), skipping");
                return Ok(RepairOutcome::SettingsUnreadable { backup, reason });
            }
            BackupLoad::NoHistory => {
                warn!("Backup has no migration history, skipping");
                return Ok(RepairOutcome::NoHistory { backup });
            }
        };

        if !is_affected(&document.migrations) {
            warn!("Skipping, settings were not affected");
            return Ok(RepairOutcome::NotAffected { backup });
        }
        warn!("Settings are affected, comparing against backup");

        let live = tx.read_all()?;
        if live.is_empty() {
            warn!("Cannot find settings in the live store");
            return Ok(RepairOutcome::Repaired {
                backup,
                reverted: Vec::new(),
            });
        }

        let writes = reconcile(&document.settings, &live);
        if writes.is_empty() {
            info!("No settings need reverting");
        }

        let live_by_key: HashMap<&str, &SettingRecord> =
            live.iter().map(|row| (row.key.as_str(), row)).collect();
        let mut reverted = Vec::with_capacity(writes.len());

        for write in &writes {
            let row = live_by_key
                .get(write.key.as_str())
                .copied()
                .ok_or_else(|| Error::SettingNotFound(write.key.clone()))?;

            info!("Reverting setting {}", write.key);
            tx.update_value(&write.key, &write.new_value)?;

            journal.record(self.cache.as_ref(), &write.key)?;
            self.cache
                .set(&write.key, self.refreshed_entry(row, &write.new_value))?;
            debug!("Settings cache updated for {}", write.key);

            reverted.push(write.key.clone());
        }

        Ok(RepairOutcome::Repaired { backup, reverted })
    }

    /// Cache entry matching what a fresh read of `row` returns after the write
    fn refreshed_entry(&self, row: &SettingRecord, new_value: &str) -> CachedSetting {
        CachedSetting {
            value: coerce_value(Some(new_value)),
            updated_at: Some(truncate_to_second((self.clock)())),
            ..CachedSetting::from_record(row)
        }
    }
}
