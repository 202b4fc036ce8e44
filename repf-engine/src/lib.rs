//! # repf-engine
//!
//! Chain construction, PEP dispatch, the built-in engine variants, and the
//! policy document interpreter.

pub mod chain;
pub mod dispatcher;
pub mod engines;
pub mod interpreter;
pub mod ops;
pub mod registry;
pub mod submission;

pub use chain::{ChainInstance, RuleEngineChain};
pub use dispatcher::PepDispatcher;
pub use engines::{CompositionEngine, PassthroughEngine};
pub use interpreter::DocumentInterpreter;
pub use ops::OperationRegistry;
pub use registry::{EngineFactory, PluginRegistry};
pub use submission::{parse_submission, Submission};
