//! Built-in rule engine variants.
//! Further variants arrive through `PluginRegistry::register`.

pub mod composition;
pub mod passthrough;

pub use composition::CompositionEngine;
pub use passthrough::PassthroughEngine;
