//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions, plus the non-fatal outcomes a read or write can
//! report without failing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
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

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection no longer answers queries
    #[error("Database connection is not usable: {0}")]
    Unhealthy(String),

    /// A required field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Insert requested for a record that already has an id
    #[error("{kind} {id} is already persisted; use an update instead")]
    AlreadyPersisted { kind: &'static str, id: i64 },

    /// Update requested for a record that was never inserted
    #[error("{kind} has not been persisted yet; create it first")]
    NotPersisted { kind: &'static str },

    /// Registration with a name that is already in use
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

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
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Unhealthy(_) => Some("Reconnect to the database and retry the operation."),
            StorageError::UsernameTaken(_) => Some("Pick a different user name."),
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

/// Outcome of an update or delete keyed by id
///
/// Touching zero rows is not an error; the caller decides whether it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The statement changed this many rows
    Applied(usize),
    /// No row matched the id
    NoRowsAffected,
}

impl WriteOutcome {
    pub fn from_rows(rows: usize) -> Self {
        if rows == 0 {
            WriteOutcome::NoRowsAffected
        } else {
            WriteOutcome::Applied(rows)
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, WriteOutcome::NoRowsAffected)
    }
}

/// A data problem found while reading, papered over with a safe default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// A stored timestamp could not be parsed; the current time was used
    UnparseableTimestamp {
        entry_id: i64,
        column: &'static str,
        raw: Option<String>,
    },
    /// A tag fragment was not a `name:color` pair and was dropped
    MalformedTag { entry_id: i64, fragment: String },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityWarning::UnparseableTimestamp {
                entry_id,
                column,
                raw,
            } => write!(
                f,
                "entry {}: unparseable {} {:?}, substituted current time",
                entry_id, column, raw
            ),
            DataQualityWarning::MalformedTag { entry_id, fragment } => {
                write!(f, "entry {}: dropped malformed tag {:?}", entry_id, fragment)
            }
        }
    }
}
