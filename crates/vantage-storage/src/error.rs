//! Storage error types for vantage-storage.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An edge endpoint does not exist.
    #[error("node not found: {key}")]
    NodeNotFound { key: String },

    /// Waiting for another transaction's write lock took too long.
    #[error("timed out waiting for write lock on {key}")]
    LockTimeout { key: String },

    /// A write was attempted through a read-only transaction.
    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    /// A lock guarding shared state was poisoned by a panicking thread.
    #[error("storage lock poisoned")]
    Poisoned,

    /// Stored data could not be interpreted.
    #[error("integrity error: {reason}")]
    Integrity { reason: String },
}
