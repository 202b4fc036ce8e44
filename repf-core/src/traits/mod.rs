//! Shared trait seams.

pub mod enqueue;
pub mod rule_engine;

pub use enqueue::DelayEnqueue;
pub use rule_engine::RuleEngine;
