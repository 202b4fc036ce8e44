//! # repf-server
//!
//! Runtime assembly for the rule engine framework.
//!
//! - [`RepfRuntime`]: bootstrap, dispatch, submissions, restart
//! - [`DelayServer`]: background sweeper executing queued entries

pub mod delay_server;
pub mod runtime;

pub use delay_server::{poll_once, DelayServer};
pub use runtime::{OperationRun, RepfRuntime, Submitted};
