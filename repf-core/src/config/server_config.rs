//! Server configuration consumed by chain construction and the delay server.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConfigError;

/// Top-level server configuration.
///
/// JSON layout:
/// ```json
/// {
///   "plugin_configuration": {
///     "rule_engines": [
///       { "instance_name": "...", "plugin_name": "...",
///         "plugin_specific_configuration": {} }
///     ]
///   },
///   "advanced_settings": { "rule_engine_server_sleep_time_in_seconds": 30 },
///   "default_rule_engine_plugin": "..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub plugin_configuration: PluginConfiguration,
    pub advanced_settings: AdvancedSettings,
    /// Plugin whose first instance is the default delay target.
    /// Absent means the first instance in the chain.
    pub default_rule_engine_plugin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PluginConfiguration {
    /// Ordered list of instances; list order is chain order.
    pub rule_engines: Vec<RuleEngineInstanceConfig>,
}

/// One configured rule engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEngineInstanceConfig {
    /// Unique within the chain.
    pub instance_name: String,
    /// Selects the engine variant.
    pub plugin_name: String,
    /// Opaque to the framework; handed to the variant's constructor.
    #[serde(default)]
    pub plugin_specific_configuration: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Delay server poll interval. Bounds eligibility-to-execution latency,
    /// not correctness.
    pub rule_engine_server_sleep_time_in_seconds: f64,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            rule_engine_server_sleep_time_in_seconds: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;
        let config: ServerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string (for testing).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError {
                path: "<string>".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    ///
    /// An empty chain is valid: every dispatch then exhausts immediately
    /// with implicit success.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for engine in &self.plugin_configuration.rule_engines {
            if engine.instance_name.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "rule_engines.instance_name".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            if engine.plugin_name.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    field: "rule_engines.plugin_name".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            if !seen.insert(engine.instance_name.as_str()) {
                return Err(ConfigError::DuplicateInstance {
                    instance: engine.instance_name.clone(),
                });
            }
        }

        let sleep = self
            .advanced_settings
            .rule_engine_server_sleep_time_in_seconds;
        if !sleep.is_finite() || sleep <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                field: "advanced_settings.rule_engine_server_sleep_time_in_seconds"
                    .to_string(),
                message: "must be a positive number of seconds".to_string(),
            });
        }

        Ok(())
    }

    /// The configured instances, in chain order.
    pub fn rule_engines(&self) -> &[RuleEngineInstanceConfig] {
        &self.plugin_configuration.rule_engines
    }

    /// Delay server poll interval.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs_f64(
            self.advanced_settings
                .rule_engine_server_sleep_time_in_seconds,
        )
    }
}
