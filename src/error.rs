//! Error types for settings-repair

use thiserror::Error;

/// Result type alias for repair operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for settings-repair
///
/// Only hard failures live here. A missing backup, an unreadable backup or a
/// store that was never affected are reported through
/// [`RepairOutcome`](crate::RepairOutcome) instead.
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    DirectoryRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    #[error("Settings store error: {0}")]
    Store(String),

    // -------------------------------------------------------------------------
    // Authorization Errors
    // -------------------------------------------------------------------------
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::SettingNotFound(_))
    }

    /// Check if this error came from the live settings store
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Error::SettingNotFound(_)
                | Error::Store(_)
                | Error::PermissionDenied(_)
                | Error::FileWrite { .. }
        )
    }
}
