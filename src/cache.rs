//! Process-wide settings cache
//!
//! The host answers settings reads from memory. Any row the repair rewrites
//! must be mirrored here, because later startup steps in the same process
//! read the cache rather than the table.

use crate::backup::{RecordId, SettingRecord, timestamp};
use crate::error::{Error, Result};
use crate::sync::RwLockExt;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::RwLock;
use time::{Duration, OffsetDateTime};

/// Cache strategy for the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// Keep every entry (default)
    #[default]
    Full,
    /// LRU cache with maximum entries
    Lru(usize),
}

impl CacheStrategy {
    /// Validate cache strategy configuration
    ///
    /// # Errors
    ///
    /// Returns error if LRU size is 0
    pub fn validate(&self) -> Result<()> {
        match self {
            CacheStrategy::Lru(0) => Err(Error::Config(
                "LRU cache size must be greater than 0".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// A settings entry as the running process sees it
///
/// Unlike [`SettingRecord`], the value is already in its runtime
/// representation (`"true"` becomes a JSON boolean).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSetting {
    pub id: Option<RecordId>,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<OffsetDateTime>,
    pub created_by: Option<RecordId>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<OffsetDateTime>,
    pub updated_by: Option<RecordId>,
}

impl CachedSetting {
    /// Mirror a table row, truncating its timestamps to whole seconds
    pub fn from_record(record: &SettingRecord) -> Self {
        Self {
            id: record.id.clone(),
            key: record.key.clone(),
            kind: record.kind.clone(),
            value: coerce_value(record.value.as_deref()),
            created_at: record.created_at.map(truncate_to_second),
            created_by: record.created_by.clone(),
            updated_at: record.updated_at.map(truncate_to_second),
            updated_by: record.updated_by.clone(),
        }
    }
}

/// Convert a stored string into the value the cache hands out
///
/// `"true"`/`"false"` become booleans, `null` stays null, anything else is
/// kept as a string.
pub fn coerce_value(raw: Option<&str>) -> Value {
    match raw {
        Some("true") => Value::Bool(true),
        Some("false") => Value::Bool(false),
        Some(other) => Value::String(other.to_string()),
        None => Value::Null,
    }
}

/// Drop the sub-second part of a timestamp
pub fn truncate_to_second(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

/// Key-value view of settings consulted by the running process
pub trait SettingsCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CachedSetting>>;

    fn set(&self, key: &str, entry: CachedSetting) -> Result<()>;

    /// Remove an entry, returning what was there
    fn remove(&self, key: &str) -> Result<Option<CachedSetting>>;
}

enum Entries {
    Full(HashMap<String, CachedSetting>),
    Lru(LruCache<String, CachedSetting>),
}

/// Default [`SettingsCache`] implementation
pub struct SettingsCacheMirror {
    entries: RwLock<Entries>,
}

impl Default for SettingsCacheMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsCacheMirror {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::Full(HashMap::new())),
        }
    }

    /// Create a mirror with an explicit strategy
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for `CacheStrategy::Lru(0)`.
    pub fn with_strategy(strategy: CacheStrategy) -> Result<Self> {
        strategy.validate()?;
        let entries = match strategy {
            CacheStrategy::Full => Entries::Full(HashMap::new()),
            CacheStrategy::Lru(size) => {
                let size = NonZeroUsize::new(size)
                    .ok_or_else(|| Error::Config("LRU cache size must be greater than 0".into()))?;
                Entries::Lru(LruCache::new(size))
            }
        };
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Seed the mirror from table rows
    pub fn populate(&self, records: &[SettingRecord]) -> Result<()> {
        for record in records {
            self.set(&record.key, CachedSetting::from_record(record))?;
        }
        log::debug!("Settings cache populated with {} entries", records.len());
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let guard = self.entries.read_recovered()?;
        Ok(match &*guard {
            Entries::Full(map) => map.len(),
            Entries::Lru(lru) => lru.len(),
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SettingsCache for SettingsCacheMirror {
    fn get(&self, key: &str) -> Result<Option<CachedSetting>> {
        {
            let guard = self.entries.read_recovered()?;
            if let Entries::Full(map) = &*guard {
                return Ok(map.get(key).cloned());
            }
        }
        // LRU lookups update recency
        let mut guard = self.entries.write_recovered()?;
        Ok(match &mut *guard {
            Entries::Full(map) => map.get(key).cloned(),
            Entries::Lru(lru) => lru.get(key).cloned(),
        })
    }

    fn set(&self, key: &str, entry: CachedSetting) -> Result<()> {
        let mut guard = self.entries.write_recovered()?;
        match &mut *guard {
            Entries::Full(map) => {
                map.insert(key.to_string(), entry);
            }
            Entries::Lru(lru) => {
                lru.put(key.to_string(), entry);
            }
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<CachedSetting>> {
        let mut guard = self.entries.write_recovered()?;
        Ok(match &mut *guard {
            Entries::Full(map) => map.remove(key),
            Entries::Lru(lru) => lru.pop(key),
        })
    }
}
