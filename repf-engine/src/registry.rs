//! Plugin registry: maps plugin names to engine factories.

use std::collections::HashMap;
use std::sync::Arc;

use repf_core::config::RuleEngineInstanceConfig;
use repf_core::errors::ConfigError;
use repf_core::traits::{DelayEnqueue, RuleEngine};

use crate::engines::{CompositionEngine, PassthroughEngine};
use crate::ops::OperationRegistry;

/// Plugin name of the built-in passthrough variant.
pub const PLUGIN_PASSTHROUGH: &str = "passthrough";

/// Plugin name of the built-in policy-composition variant.
pub const PLUGIN_POLICY_COMPOSITION: &str = "policy_composition";

/// Constructs one engine from one instance configuration.
pub type EngineFactory = Box<
    dyn Fn(&RuleEngineInstanceConfig) -> Result<Box<dyn RuleEngine>, ConfigError>
        + Send
        + Sync,
>;

/// Resolves `plugin_name` to an engine factory during chain construction.
///
/// Native, compiled, and scripting variants are external; embedders register
/// them here under their own plugin names.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, EngineFactory>,
}

impl PluginRegistry {
    /// An empty registry with no variants.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in variants.
    pub fn with_builtins(
        ops: Arc<OperationRegistry>,
        enqueuer: Arc<dyn DelayEnqueue>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(PLUGIN_PASSTHROUGH, |config| {
            Ok(Box::new(PassthroughEngine::from_config(
                &config.plugin_specific_configuration,
            )?) as Box<dyn RuleEngine>)
        });
        registry.register(PLUGIN_POLICY_COMPOSITION, move |_config| {
            Ok(Box::new(CompositionEngine::new(ops.clone(), enqueuer.clone()))
                as Box<dyn RuleEngine>)
        });
        registry
    }

    /// Register a factory under `plugin_name`, replacing any previous one.
    pub fn register<F>(&mut self, plugin_name: &str, factory: F)
    where
        F: Fn(&RuleEngineInstanceConfig) -> Result<Box<dyn RuleEngine>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(plugin_name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, plugin_name: &str) -> bool {
        self.factories.contains_key(plugin_name)
    }

    /// Build an engine for one configured instance.
    /// An unresolvable plugin name is fatal at construction time.
    pub fn resolve(
        &self,
        config: &RuleEngineInstanceConfig,
    ) -> Result<Box<dyn RuleEngine>, ConfigError> {
        match self.factories.get(&config.plugin_name) {
            Some(factory) => factory(config),
            None => Err(ConfigError::UnknownPlugin {
                plugin: config.plugin_name.clone(),
            }),
        }
    }
}
