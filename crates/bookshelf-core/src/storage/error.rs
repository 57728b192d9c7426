//! Storage error handling
//!
//! Typed errors for the storage media (cookie jar, web storage areas and
//! object databases) with descriptive messages and recovery suggestions.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a storage medium
#[derive(Error, Debug)]
pub enum StorageError {
    /// The medium is disabled or failed its availability probe
    #[error("{medium} is not available: {reason}")]
    Unavailable {
        medium: &'static str,
        reason: String,
    },

    /// A write would exceed the medium's size limit
    #[error("{medium} quota exceeded: {needed} bytes needed, {limit} bytes allowed")]
    QuotaExceeded {
        medium: &'static str,
        needed: usize,
        limit: usize,
    },

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full
    #[error("Disk full while writing to '{path}'. Free up disk space and try again.")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored file could not be parsed
    #[error("Invalid format in '{path}': {details}")]
    InvalidFormat { path: PathBuf, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Requested database version is older than the stored one
    #[error("Cannot open '{database}' at version {requested}: stored version is {stored}")]
    VersionError {
        database: String,
        requested: u32,
        stored: u32,
    },

    /// Database was upgraded by another connection; this one was closed
    #[error("Database '{database}' changed to version {stored}; connection closed")]
    VersionChange { database: String, stored: u32 },

    /// Object store was never created by an upgrade
    #[error("Object store '{name}' not found in '{database}'. Raise store_version to create it.")]
    ObjectStoreNotFound { database: String, name: String },

    /// Record has no usable value at the key field
    #[error("Record key field '{key_field}' is missing or not an integer/string")]
    InvalidKey { key_field: String },

    /// Object store exists with a different key field than the one requested
    #[error("Object store '{name}' is keyed by '{stored}', not '{requested}'. Use a new record_set_name to re-key it.")]
    KeyPathMismatch {
        name: String,
        stored: String,
        requested: String,
    },

    /// Operation did not settle in time
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Background storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    TaskFailed(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::QuotaExceeded { .. }
                | StorageError::VersionChange { .. }
                | StorageError::Timeout { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::QuotaExceeded { .. } => {
                Some("The collection is too large for this backend. Switch to the indexeddb backend.")
            }
            StorageError::VersionChange { .. } => Some("Retry the operation to reopen the database."),
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Unavailable { .. } => {
                Some("Enable the storage medium or choose another backend.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
