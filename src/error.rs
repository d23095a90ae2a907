//! Error types for fsstat
//!
//! This module defines the error hierarchy for a scan:
//! - Filesystem errors (stat / readdir), all fatal to the run
//! - SQLite and sink errors, also fatal
//! - Configuration errors raised before any task starts
//!
//! Nothing in the scan retries. Any one node failing invalidates the totals
//! of every ancestor, so the whole run is aborted instead.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a scan
#[derive(Error, Debug)]
pub enum ScanError {
    /// Filesystem errors
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Database / sink errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The concurrency limiter was closed while a task waited on it
    #[error("Concurrency limiter closed")]
    LimiterClosed,

    /// Every node id has been handed out
    #[error("Node id space exhausted at {last}")]
    IdsExhausted { last: u32 },

    /// A walker task panicked or was cancelled
    #[error("Walker task failed: {0}")]
    TaskFailed(String),

    /// The scan root is neither a regular file nor a directory
    #[error("Unsupported scan root '{path}': not a regular file or directory")]
    UnsupportedRoot { path: PathBuf },
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScanError::TaskFailed(err.to_string())
    }
}

/// Filesystem access errors
#[derive(Error, Debug)]
pub enum FsError {
    /// Path does not exist
    #[error("Path not found: '{path}'")]
    NotFound { path: PathBuf },

    /// Stat operation failed
    #[error("Failed to stat '{path}': {source}")]
    StatFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing failed
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// The path the failing operation was applied to
    pub fn path(&self) -> &std::path::Path {
        match self {
            FsError::NotFound { path }
            | FsError::StatFailed { path, .. }
            | FsError::ReadDirFailed { path, .. } => path.as_path(),
        }
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to create database file
    #[error("Failed to create database at '{path}': {reason}")]
    CreateFailed { path: PathBuf, reason: String },

    /// Sink channel closed unexpectedly (the writer has stopped)
    #[error("Database writer channel closed unexpectedly")]
    ChannelClosed,

    /// Writer thread panicked before reporting a result
    #[error("Database writer thread panicked")]
    WriterPanicked,

    /// Failed to start the writer's runtime
    #[error("Failed to start writer runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid limiter capacity
    #[error("Invalid concurrency {count}: must be between 1 and {max}")]
    InvalidConcurrency { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid buffer size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Invalid producer queue depth
    #[error("Invalid queue depth {size}: must be at least {min}")]
    InvalidQueueDepth { size: usize, min: usize },

    /// Invalid runtime thread count
    #[error("Invalid thread count {count}: must be at least 1")]
    InvalidThreads { count: usize },

    /// Scan root missing or unreadable
    #[error("Cannot scan '{path}': {reason}")]
    RootNotFound { path: PathBuf, reason: String },

    /// Output database already present
    #[error("Database '{path}' already exists (use --force to overwrite)")]
    OutputExists { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for FsError
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_path() {
        let err = FsError::ReadDirFailed {
            path: PathBuf::from("/data/dir"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.path(), std::path::Path::new("/data/dir"));
        assert!(err.to_string().contains("/data/dir"));
    }

    #[test]
    fn test_error_conversion() {
        let fs_err = FsError::NotFound {
            path: "/missing".into(),
        };
        let scan_err: ScanError = fs_err.into();
        assert!(matches!(scan_err, ScanError::Fs(FsError::NotFound { .. })));

        let db_err: ScanError = DbError::ChannelClosed.into();
        assert!(matches!(db_err, ScanError::Database(DbError::ChannelClosed)));
    }
}
