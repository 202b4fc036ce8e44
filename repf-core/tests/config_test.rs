//! Tests for server configuration loading.

use repf_core::config::ServerConfig;
use repf_core::errors::ConfigError;

fn tempdir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

#[test]
fn load_reads_and_validates_a_config_file() {
    let dir = tempdir();
    let path = dir.path().join("server_config.json");
    std::fs::write(
        &path,
        r#"{
            "plugin_configuration": {
                "rule_engines": [
                    {
                        "instance_name": "pt-instance",
                        "plugin_name": "passthrough",
                        "plugin_specific_configuration": {
                            "return_codes_for_peps": [
                                { "regex": "pep_api_.*_pre", "code": -840000 }
                            ]
                        }
                    }
                ]
            },
            "advanced_settings": {
                "rule_engine_server_sleep_time_in_seconds": 1
            },
            "default_rule_engine_plugin": "passthrough"
        }"#,
    )
    .unwrap();

    let config = ServerConfig::load(&path).unwrap();
    assert_eq!(config.rule_engines().len(), 1);
    assert_eq!(config.rule_engines()[0].instance_name, "pt-instance");
    assert_eq!(
        config.default_rule_engine_plugin.as_deref(),
        Some("passthrough")
    );
}

#[test]
fn load_missing_file_is_file_not_found() {
    let dir = tempdir();
    let result = ServerConfig::load(&dir.path().join("absent.json"));
    match result.unwrap_err() {
        ConfigError::FileNotFound { .. } => {}
        other => panic!("expected FileNotFound, got: {other:?}"),
    }
}

#[test]
fn load_invalid_json_is_parse_error() {
    let dir = tempdir();
    let path = dir.path().join("server_config.json");
    std::fs::write(&path, "this is not json {{{{").unwrap();

    match ServerConfig::load(&path).unwrap_err() {
        ConfigError::ParseError { .. } => {}
        other => panic!("expected ParseError, got: {other:?}"),
    }
}

#[test]
fn unrecognized_keys_are_accepted() {
    let dir = tempdir();
    let path = dir.path().join("server_config.json");
    std::fs::write(
        &path,
        r#"{
            "plugin_configuration": { "rule_engines": [] },
            "schema_version": "v4",
            "environment_variables": {}
        }"#,
    )
    .unwrap();

    assert!(ServerConfig::load(&path).is_ok());
}

#[test]
fn duplicate_instances_fail_at_load_time() {
    let dir = tempdir();
    let path = dir.path().join("server_config.json");
    std::fs::write(
        &path,
        r#"{
            "plugin_configuration": {
                "rule_engines": [
                    { "instance_name": "same", "plugin_name": "passthrough" },
                    { "instance_name": "same", "plugin_name": "policy_composition" }
                ]
            }
        }"#,
    )
    .unwrap();

    match ServerConfig::load(&path).unwrap_err() {
        ConfigError::DuplicateInstance { instance } => assert_eq!(instance, "same"),
        other => panic!("expected DuplicateInstance, got: {other:?}"),
    }
}
