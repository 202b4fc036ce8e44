//! The ordered rule engine chain, built once per configuration generation.

use repf_core::config::ServerConfig;
use repf_core::errors::EngineError;
use repf_core::traits::RuleEngine;

use crate::registry::PluginRegistry;

/// One constructed instance in the chain.
#[derive(Debug)]
pub struct ChainInstance {
    name: String,
    plugin: String,
    engine: Box<dyn RuleEngine>,
}

impl ChainInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn engine(&self) -> &dyn RuleEngine {
        self.engine.as_ref()
    }
}

/// Ordered, immutable list of constructed rule engine instances.
///
/// Built once per configuration load; dispatch always visits instances in
/// configured order. A reconfiguration builds a new chain rather than
/// mutating this one.
#[derive(Debug)]
pub struct RuleEngineChain {
    instances: Vec<ChainInstance>,
    default_target: Option<String>,
}

impl RuleEngineChain {
    /// Build the chain: validate the configuration, resolve every plugin,
    /// and start every engine. Fails fast; a chain is never half-built.
    pub fn build(
        config: &ServerConfig,
        registry: &PluginRegistry,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;

        let mut instances = Vec::with_capacity(config.rule_engines().len());
        for engine_config in config.rule_engines() {
            let engine = registry.resolve(engine_config)?;
            engine.start()?;
            instances.push(ChainInstance {
                name: engine_config.instance_name.clone(),
                plugin: engine_config.plugin_name.clone(),
                engine,
            });
        }

        let default_target = resolve_default_target(config, &instances);
        tracing::info!(
            instances = instances.len(),
            default_target = default_target.as_deref().unwrap_or("none"),
            "rule engine chain built"
        );

        Ok(Self {
            instances,
            default_target,
        })
    }

    /// The instances, in dispatch order.
    pub fn instances(&self) -> &[ChainInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Look up an instance by name.
    pub fn get(&self, name: &str) -> Option<&ChainInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The instance delayed entries run on when they carry no explicit
    /// target. `None` only for an empty chain.
    pub fn default_target_instance(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    /// Stop every engine. Failures are logged, not propagated; teardown
    /// always visits the whole chain.
    pub fn stop(&self) {
        for instance in &self.instances {
            if let Err(e) = instance.engine.stop() {
                tracing::warn!(
                    instance = %instance.name,
                    error = %e,
                    "rule engine failed to stop"
                );
            }
        }
    }
}

/// The default delay target is the first instance of the configured default
/// plugin, falling back to the first instance in the chain.
fn resolve_default_target(
    config: &ServerConfig,
    instances: &[ChainInstance],
) -> Option<String> {
    if let Some(plugin) = &config.default_rule_engine_plugin {
        if let Some(instance) = instances.iter().find(|i| &i.plugin == plugin) {
            return Some(instance.name.clone());
        }
    }
    instances.first().map(|i| i.name.clone())
}
