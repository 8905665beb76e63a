//! Finds the most recent dated backup in the data directory

use super::types::BackupFile;
use crate::error::{Error, Result};
use log::debug;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use time::{Date, Month};

/// `ghost.<YYYY-MM-DD>.json`, anchored at the end of the file name
static BACKUP_FILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ghost\.(\d{4})-(\d{2})-(\d{2})\.json$").expect("backup file pattern is valid")
});

/// Extract the calendar date embedded in a backup file name
///
/// Returns `None` for names that do not match the pattern or whose digits do
/// not form a real date (e.g. `ghost.2018-02-30.json`).
pub fn parse_backup_date(filename: &str) -> Option<Date> {
    let caps = BACKUP_FILE_PATTERN.captures(filename)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    let day: u8 = caps[3].parse().ok()?;

    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Pick the backup with the latest embedded date among names listed in `dir`
///
/// On equal dates the first name in listing order wins.
pub fn select_latest<I, S>(dir: &Path, names: I) -> Option<BackupFile>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut latest: Option<BackupFile> = None;

    for name in names {
        let name = name.as_ref();
        let Some(date) = parse_backup_date(name) else {
            if BACKUP_FILE_PATTERN.is_match(name) {
                debug!("Ignoring backup with invalid date: {name}");
            }
            continue;
        };

        if latest.as_ref().is_none_or(|current| date > current.date) {
            latest = Some(BackupFile {
                filename: name.to_string(),
                date,
                path: dir.join(name),
            });
        }
    }

    latest
}

/// Scan `dir` and return the most recent backup, if any
///
/// # Errors
///
/// Returns [`Error::DirectoryRead`] if the directory cannot be listed.
pub fn locate_latest(dir: &Path) -> Result<Option<BackupFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::DirectoryRead {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::DirectoryRead {
            path: dir.display().to_string(),
            source: e,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    debug!("Scanned {} entries in {}", names.len(), dir.display());
    Ok(select_latest(dir, &names))
}
