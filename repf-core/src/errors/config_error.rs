//! Configuration errors.

use super::error_code::{self, RepfErrorCode};

/// Errors raised while loading server configuration or building a chain.
/// Always fatal at construction or resolution time, never masked by
/// continuing to the next instance.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Config parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Config validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Duplicate rule engine instance name: {instance}")]
    DuplicateInstance { instance: String },

    #[error("Unknown rule engine plugin: {plugin}")]
    UnknownPlugin { plugin: String },

    #[error("Rule engine instance not found: {instance}")]
    UnknownInstance { instance: String },
}

impl RepfErrorCode for ConfigError {
    fn error_code(&self) -> i64 {
        error_code::SYS_INVALID_INPUT_PARAM
    }
}
