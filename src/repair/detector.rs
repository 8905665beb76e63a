//! Decides whether a store went through the defective release

use crate::backup::MigrationRecord;

/// Release whose settings migration flipped values to `"false"`
pub const DEFECTIVE_RELEASE: &str = "2.16";

/// Release that shipped the corrected migration
pub const CORRECTIVE_RELEASE: &str = "2.17";

/// A store is affected iff its history contains the defective release and
/// not the corrective one.
///
/// Versions are compared as exact strings.
pub fn is_affected(history: &[MigrationRecord]) -> bool {
    let ran = |version: &str| history.iter().any(|m| m.version == version);
    ran(DEFECTIVE_RELEASE) && !ran(CORRECTIVE_RELEASE)
}
