//! Configuration for the framework.
//! JSON-based, one document, validated at load time.

pub mod server_config;

pub use server_config::{
    AdvancedSettings, PluginConfiguration, RuleEngineInstanceConfig, ServerConfig,
};
