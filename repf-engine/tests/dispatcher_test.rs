//! Chain dispatch integration tests: continuation, termination, ordering,
//! and instance targeting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use repf_core::config::ServerConfig;
use repf_core::delay::NewDelayedRule;
use repf_core::errors::error_code::RULE_ENGINE_CONTINUE;
use repf_core::errors::{ConfigError, EngineError, RepfErrorCode, StorageError};
use repf_core::event::PolicyEvent;
use repf_core::sink::MemorySink;
use repf_core::traits::{DelayEnqueue, RuleEngine};
use repf_engine::chain::RuleEngineChain;
use repf_engine::dispatcher::PepDispatcher;
use repf_engine::ops::OperationRegistry;
use repf_engine::registry::PluginRegistry;

struct NullQueue;

impl DelayEnqueue for NullQueue {
    fn enqueue(&self, _entry: NewDelayedRule) -> Result<i64, StorageError> {
        Ok(1)
    }
}

/// Shared record of every (instance, event) invocation, in order.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<(String, String)>>,
}

impl CallLog {
    fn record(&self, instance: &str, event: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((instance.to_string(), event.to_string()));
    }

    fn instances_in_order(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(i, _)| i.clone()).collect()
    }

    fn count_for(&self, instance: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(i, _)| i == instance).count()
    }
}

/// Deterministic engine driven by its instance configuration:
/// `rules` maps exact event names to codes, `fail` maps event names to
/// error codes raised as engine errors. Everything else continues.
struct ScriptedEngine {
    label: String,
    rules: HashMap<String, i64>,
    failures: HashMap<String, i64>,
    log: Arc<CallLog>,
}

impl RuleEngine for ScriptedEngine {
    fn handle(&self, event: &PolicyEvent) -> Result<i64, EngineError> {
        self.log.record(&self.label, &event.name);
        if let Some(code) = self.failures.get(&event.name) {
            return Err(EngineError::Execution {
                code: *code,
                message: "scripted failure".to_string(),
            });
        }
        Ok(self
            .rules
            .get(&event.name)
            .copied()
            .unwrap_or(RULE_ENGINE_CONTINUE))
    }
}

fn code_map(value: Option<&Value>) -> HashMap<String, i64> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_i64().map(|code| (k.clone(), code)))
                .collect()
        })
        .unwrap_or_default()
}

/// Build a dispatcher over the given config, with the `scripted` plugin
/// wired to a shared call log and a memory sink capturing contract lines.
fn build(config_json: &str) -> (PepDispatcher, Arc<MemorySink>, Arc<CallLog>) {
    let config = ServerConfig::from_json_str(config_json).unwrap();
    let log = Arc::new(CallLog::default());

    let mut registry = PluginRegistry::with_builtins(
        Arc::new(OperationRegistry::new()),
        Arc::new(NullQueue),
    );
    let factory_log = log.clone();
    registry.register("scripted", move |cfg| {
        Ok(Box::new(ScriptedEngine {
            label: cfg.instance_name.clone(),
            rules: code_map(cfg.plugin_specific_configuration.get("rules")),
            failures: code_map(cfg.plugin_specific_configuration.get("fail")),
            log: factory_log.clone(),
        }) as Box<dyn RuleEngine>)
    });

    let chain = RuleEngineChain::build(&config, &registry).unwrap();
    let sink = Arc::new(MemorySink::new());
    let dispatcher = PepDispatcher::new(Arc::new(chain), sink.clone());
    (dispatcher, sink, log)
}

// ---- single-instance continuation ----

#[test]
fn lone_continuation_yields_implicit_success() {
    let (dispatcher, sink, log) = build(
        r#"{
            "plugin_configuration": {
                "rule_engines": [
                    {
                        "instance_name": "pt",
                        "plugin_name": "passthrough",
                        "plugin_specific_configuration": {
                            "return_codes_for_peps": [
                                { "regex": "pep_api_data_obj_put_post", "code": 5000000 }
                            ]
                        }
                    }
                ]
            }
        }"#,
    );

    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_data_obj_put_post"));

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "none");
    assert!(!outcome.is_error());

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        "rule engine plugin [pt] returned '5000000' to REPF."
    );
    assert_eq!(log.count_for("pt"), 1);
}

// ---- pre-hook error aborts before the post-hook ----

#[test]
fn pre_hook_error_surfaces_and_post_is_never_dispatched() {
    let (dispatcher, sink, _log) = build(
        r#"{
            "plugin_configuration": {
                "rule_engines": [
                    {
                        "instance_name": "pre-coded",
                        "plugin_name": "passthrough",
                        "plugin_specific_configuration": {
                            "return_codes_for_peps": [
                                { "regex": "pep_api_obj_stat_pre", "code": -840000 }
                            ]
                        }
                    },
                    {
                        "instance_name": "post-coded",
                        "plugin_name": "passthrough",
                        "plugin_specific_configuration": {
                            "return_codes_for_peps": [
                                { "regex": "pep_api_obj_stat_post", "code": 5000000 }
                            ]
                        }
                    }
                ]
            }
        }"#,
    );

    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_obj_stat_pre"));
    assert_eq!(outcome.code, -840_000);
    assert_eq!(outcome.issuer(), "pre-coded");
    assert!(outcome.is_error());

    // The pre hook failed, so its operation aborts and the post hook is
    // never raised. The log must show the one error line and no
    // continuation sentinel for this operation.
    assert_eq!(sink.count_containing("'-840000'"), 1);
    assert_eq!(sink.count_containing("'5000000'"), 0);
    assert_eq!(sink.lines().len(), 1);
}

// ---- two instances, per-event divergence ----

#[test]
fn chain_walks_both_instances_per_event_name() {
    let config = r#"{
        "plugin_configuration": {
            "rule_engines": [
                {
                    "instance_name": "instance1",
                    "plugin_name": "passthrough",
                    "plugin_specific_configuration": {
                        "return_codes_for_peps": [
                            { "regex": "pep_database_open_pre|pep_api_gen_query_pre", "code": 5000000 }
                        ]
                    }
                },
                {
                    "instance_name": "instance2",
                    "plugin_name": "passthrough",
                    "plugin_specific_configuration": {
                        "return_codes_for_peps": [
                            { "regex": "pep_api_gen_query_pre", "code": -840000 }
                        ]
                    }
                }
            ]
        }
    }"#;

    // Both instances continue for pep_database_open_pre; instance2 has no
    // matching rule, which is a continuation, never an error.
    let (dispatcher, sink, _) = build(config);
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_database_open_pre"));
    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "none");
    assert_eq!(sink.count_containing("'5000000'"), 2);

    // For pep_api_gen_query_pre, instance1 continues and instance2
    // terminates; the log shows them in chain order.
    let (dispatcher, sink, _) = build(config);
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_gen_query_pre"));
    assert_eq!(outcome.code, -840_000);
    assert_eq!(outcome.issuer(), "instance2");

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("[instance1]") && lines[0].contains("'5000000'"));
    assert!(lines[1].contains("[instance2]") && lines[1].contains("'-840000'"));
}

// ---- first terminal wins ----

fn three_scripted(config_middle_code: i64) -> String {
    format!(
        r#"{{
            "plugin_configuration": {{
                "rule_engines": [
                    {{
                        "instance_name": "s1",
                        "plugin_name": "scripted",
                        "plugin_specific_configuration": {{
                            "rules": {{ "pep_api_auth_request_pre": 5000000 }}
                        }}
                    }},
                    {{
                        "instance_name": "s2",
                        "plugin_name": "scripted",
                        "plugin_specific_configuration": {{
                            "rules": {{ "pep_api_auth_request_pre": {config_middle_code} }}
                        }}
                    }},
                    {{
                        "instance_name": "s3",
                        "plugin_name": "scripted",
                        "plugin_specific_configuration": {{
                            "rules": {{ "pep_api_auth_request_pre": -999000 }}
                        }}
                    }}
                ]
            }}
        }}"#
    )
}

#[test]
fn first_terminal_success_stops_the_chain() {
    let (dispatcher, _, log) = build(&three_scripted(0));
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_auth_request_pre"));

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "s2");
    assert_eq!(log.count_for("s1"), 1);
    assert_eq!(log.count_for("s2"), 1);
    assert_eq!(log.count_for("s3"), 0);
}

#[test]
fn first_terminal_error_stops_the_chain() {
    let (dispatcher, _, log) = build(&three_scripted(-840_000));
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_auth_request_pre"));

    assert_eq!(outcome.code, -840_000);
    assert_eq!(outcome.issuer(), "s2");
    assert_eq!(log.count_for("s3"), 0);
}

#[test]
fn full_continuation_invokes_every_instance_once_in_order() {
    let (dispatcher, _, log) = build(&three_scripted(5_000_000));
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_auth_request_pre"));

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "none");
    assert_eq!(log.instances_in_order(), ["s1", "s2", "s3"]);

    dispatcher.dispatch(&PolicyEvent::new("pep_api_auth_request_pre"));
    assert_eq!(log.count_for("s1"), 2);
    assert_eq!(log.count_for("s2"), 2);
    assert_eq!(log.count_for("s3"), 2);
}

// ---- engine errors fold into their numeric codes ----

#[test]
fn engine_error_is_logged_and_terminates_with_its_code() {
    let (dispatcher, sink, log) = build(
        r#"{
            "plugin_configuration": {
                "rule_engines": [
                    {
                        "instance_name": "failing",
                        "plugin_name": "scripted",
                        "plugin_specific_configuration": {
                            "fail": { "pep_api_data_obj_put_pre": -99000 }
                        }
                    },
                    {
                        "instance_name": "after",
                        "plugin_name": "scripted",
                        "plugin_specific_configuration": {}
                    }
                ]
            }
        }"#,
    );

    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_data_obj_put_pre"));
    assert_eq!(outcome.code, -99_000);
    assert_eq!(outcome.issuer(), "failing");
    assert_eq!(sink.count_containing("'-99000'"), 1);
    assert_eq!(log.count_for("after"), 0);
}

// ---- targeted dispatch ----

#[test]
fn targeted_dispatch_skips_the_rest_of_the_chain() {
    let (dispatcher, _, log) = build(&three_scripted(-840_000));
    let event = PolicyEvent::new("pep_api_auth_request_pre");

    let outcome = dispatcher.dispatch_to_instance("s3", &event).unwrap();
    assert_eq!(outcome.code, -999_000);
    assert_eq!(outcome.issuer(), "s3");
    assert_eq!(log.count_for("s1"), 0);
    assert_eq!(log.count_for("s2"), 0);
}

#[test]
fn targeted_continuation_is_an_implicit_success() {
    let (dispatcher, _, _) = build(&three_scripted(0));
    let event = PolicyEvent::new("pep_api_unrelated_post");

    let outcome = dispatcher.dispatch_to_instance("s1", &event).unwrap();
    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "none");
}

#[test]
fn unknown_target_instance_is_a_configuration_error() {
    let (dispatcher, _, _) = build(&three_scripted(0));
    let event = PolicyEvent::new("pep_api_auth_request_pre");

    let err = dispatcher.dispatch_to_instance("nope", &event).unwrap_err();
    assert_eq!(err.error_code(), -130_000);
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::UnknownInstance { ref instance }) if instance == "nope"
    ));
}

// ---- empty chain ----

#[test]
fn empty_chain_dispatch_is_implicit_success() {
    let (dispatcher, sink, _) = build(r#"{}"#);
    let outcome = dispatcher.dispatch(&PolicyEvent::new("pep_api_gen_query_pre"));

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.issuer(), "none");
    assert!(sink.lines().is_empty());
}
