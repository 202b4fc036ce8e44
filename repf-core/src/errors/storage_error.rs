//! Delay queue storage errors.

use super::error_code::{self, RepfErrorCode};

/// Errors raised by the durable delay queue.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: i64, message: String },

    #[error("Delay queue entry {id} not found")]
    EntryNotFound { id: i64 },

    #[error("Delay queue entry {id} is {status}, expected {expected}")]
    InvalidStatus {
        id: i64,
        status: String,
        expected: String,
    },
}

impl RepfErrorCode for StorageError {
    fn error_code(&self) -> i64 {
        error_code::RULE_ENGINE_ERROR
    }
}
