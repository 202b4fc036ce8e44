//! Error handling for REPF.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod document_error;
pub mod engine_error;
pub mod error_code;
pub mod server_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use document_error::DocumentError;
pub use engine_error::EngineError;
pub use error_code::RepfErrorCode;
pub use server_error::ServerError;
pub use storage_error::StorageError;
