//! Detection and repair of settings flipped by the defective release

mod detector;
mod orchestrator;
mod reconcile;

pub use detector::{CORRECTIVE_RELEASE, DEFECTIVE_RELEASE, is_affected};
pub use orchestrator::{Clock, RepairOutcome, SettingsRepair};
pub use reconcile::{ELIGIBLE_KEYS, WriteInstruction, is_eligible, reconcile};
