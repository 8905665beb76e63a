//! Compares eligible live settings against the backup

use crate::backup::SettingRecord;
use log::debug;
use std::collections::HashMap;

/// Settings the defective release could have flipped
pub const ELIGIBLE_KEYS: [&str; 3] = ["is_private", "force_i18n", "amp"];

const CORRUPTED_VALUE: &str = "false";
const RESTORED_VALUE: &str = "true";

/// A single row to rewrite in the live store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteInstruction {
    pub key: String,
    pub new_value: String,
}

pub fn is_eligible(key: &str) -> bool {
    ELIGIBLE_KEYS.contains(&key)
}

/// Produce the writes needed to undo the false-for-true corruption
///
/// Only a live `"false"` paired with a backup `"true"` yields an
/// instruction. Keys the backup does not carry are skipped. Instructions
/// follow live row order.
pub fn reconcile(backup: &[SettingRecord], live: &[SettingRecord]) -> Vec<WriteInstruction> {
    // Later rows win if the backup repeats a key
    let backup_by_key: HashMap<&str, &SettingRecord> = backup
        .iter()
        .filter(|s| is_eligible(&s.key))
        .map(|s| (s.key.as_str(), s))
        .collect();

    live.iter()
        .filter(|s| is_eligible(&s.key))
        .filter_map(|live_setting| {
            let Some(backup_setting) = backup_by_key.get(live_setting.key.as_str()) else {
                debug!(
                    "Backup has no '{}' setting, leaving it unchanged",
                    live_setting.key
                );
                return None;
            };

            if live_setting.value_is(CORRUPTED_VALUE) && backup_setting.value_is(RESTORED_VALUE) {
                Some(WriteInstruction {
                    key: live_setting.key.clone(),
                    new_value: RESTORED_VALUE.to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}
