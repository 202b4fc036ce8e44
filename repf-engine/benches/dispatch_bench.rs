//! Dispatch benchmarks.
//!
//! Benchmarks: full chain walk (all instances continue), early termination,
//! and rule-text submission parsing.
//! Run with: cargo bench -p repf-engine --bench dispatch_bench

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use repf_core::config::ServerConfig;
use repf_core::delay::NewDelayedRule;
use repf_core::errors::StorageError;
use repf_core::event::PolicyEvent;
use repf_core::sink::ReturnCodeSink;
use repf_core::traits::DelayEnqueue;
use repf_engine::chain::RuleEngineChain;
use repf_engine::dispatcher::PepDispatcher;
use repf_engine::ops::OperationRegistry;
use repf_engine::registry::PluginRegistry;
use repf_engine::submission::parse_submission;

struct NoOpSink;
impl ReturnCodeSink for NoOpSink {
    fn code_returned(&self, _instance: &str, _pep_name: &str, _code: i64) {}
}

struct NullQueue;
impl DelayEnqueue for NullQueue {
    fn enqueue(&self, _entry: NewDelayedRule) -> Result<i64, StorageError> {
        Ok(1)
    }
}

/// Build a dispatcher over `count` passthrough instances. Every instance
/// matches post events with a continuation code; the first instance can be
/// given a terminal code instead.
fn build_dispatcher(count: usize, first_code: i64) -> PepDispatcher {
    let mut engines = Vec::with_capacity(count);
    for i in 0..count {
        let code = if i == 0 { first_code } else { 5_000_000 };
        engines.push(serde_json::json!({
            "instance_name": format!("pt-{i}"),
            "plugin_name": "passthrough",
            "plugin_specific_configuration": {
                "return_codes_for_peps": [
                    { "regex": "pep_api_.*_post", "code": code }
                ]
            }
        }));
    }
    let config_value = serde_json::json!({
        "plugin_configuration": { "rule_engines": engines }
    });
    let config = ServerConfig::from_json_str(&config_value.to_string()).unwrap();

    let registry = PluginRegistry::with_builtins(
        Arc::new(OperationRegistry::new()),
        Arc::new(NullQueue),
    );
    let chain = RuleEngineChain::build(&config, &registry).unwrap();
    PepDispatcher::new(Arc::new(chain), Arc::new(NoOpSink))
}

fn full_chain_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_full_walk");

    for size in [1, 4, 16] {
        let dispatcher = build_dispatcher(size, 5_000_000);
        let event = PolicyEvent::new("pep_api_data_obj_put_post");

        group.bench_with_input(BenchmarkId::new("continue_all", size), &size, |b, _| {
            b.iter(|| dispatcher.dispatch(&event));
        });
    }
    group.finish();
}

fn early_termination(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_early_exit");

    let dispatcher = build_dispatcher(16, -840_000);
    let event = PolicyEvent::new("pep_api_data_obj_put_post");

    group.bench_function("terminal_at_first_of_16", |b| {
        b.iter(|| dispatcher.dispatch(&event));
    });
    group.finish();
}

fn submission_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("submission_parse");

    let delay_form = r#"delay("<INST_NAME>pt-0</INST_NAME>60s") { writeLine("serverLog", "scheduled"); }"#;
    group.bench_function("delay_form", |b| {
        b.iter(|| parse_submission(delay_form).unwrap());
    });

    let document_form = serde_json::json!({
        "policy": "irods_policy_execute_rule",
        "payload": {
            "policy_to_invoke": "example_policy",
            "parameters": { "attribute": "size" },
            "configuration": {}
        }
    })
    .to_string();
    group.bench_function("document_form", |b| {
        b.iter(|| parse_submission(&document_form).unwrap());
    });

    group.finish();
}

criterion_group!(benches, full_chain_walk, early_termination, submission_parsing);
criterion_main!(benches);
