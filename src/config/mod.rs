//! Configuration types
//!
//! - `RepairConfig` - where backups live and how they are read
//! - `RunOptions` / `AccessContext` - per-run authorization handed to the store

mod options;
mod types;

pub use options::{AccessContext, RunOptions};
pub use types::{DEFAULT_DATA_DIR, DefaultEnvSource, EnvSource, RepairConfig, RepairConfigBuilder};
