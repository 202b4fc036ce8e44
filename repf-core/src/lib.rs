//! # repf-core
//!
//! Foundation crate for the REPF rule engine plugin framework.
//! Defines events, outcomes, policy documents, delay entries, errors,
//! configuration, and the trait seams the other crates build on.

pub mod config;
pub mod delay;
pub mod document;
pub mod errors;
pub mod event;
pub mod outcome;
pub mod sink;
pub mod telemetry;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::{RuleEngineInstanceConfig, ServerConfig};
pub use delay::{DelayCondition, DelayedRuleEntry, EntryStatus, NewDelayedRule};
pub use document::PolicyDocument;
pub use errors::{
    ConfigError, DocumentError, EngineError, RepfErrorCode, ServerError, StorageError,
};
pub use event::PolicyEvent;
pub use outcome::{classify, CodeClass, DispatchOutcome};
pub use sink::{MemorySink, ReturnCodeSink, TracingSink};
pub use traits::{DelayEnqueue, RuleEngine};
