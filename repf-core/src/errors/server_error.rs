//! Runtime-level errors.

use super::error_code::RepfErrorCode;
use super::{ConfigError, DocumentError, EngineError, StorageError};

/// Errors surfaced by the runtime facade.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Delay server is not running")]
    NotRunning,
}

impl RepfErrorCode for ServerError {
    fn error_code(&self) -> i64 {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Document(e) => e.error_code(),
            Self::Engine(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::NotRunning => super::error_code::RULE_ENGINE_ERROR,
        }
    }
}
