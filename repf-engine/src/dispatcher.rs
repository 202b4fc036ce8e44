//! The PEP dispatcher: chain-of-responsibility with first-terminal-wins.

use std::sync::Arc;

use repf_core::errors::{ConfigError, EngineError, RepfErrorCode};
use repf_core::event::PolicyEvent;
use repf_core::outcome::{classify, CodeClass, DispatchOutcome};
use repf_core::sink::ReturnCodeSink;

use crate::chain::{ChainInstance, RuleEngineChain};

/// Walks the chain for each event and classifies every returned code.
///
/// Holds nothing mutable beyond the shared chain reference, so concurrent
/// dispatches of different events need no locking between each other.
pub struct PepDispatcher {
    chain: Arc<RuleEngineChain>,
    sink: Arc<dyn ReturnCodeSink>,
}

impl PepDispatcher {
    pub fn new(chain: Arc<RuleEngineChain>, sink: Arc<dyn ReturnCodeSink>) -> Self {
        Self { chain, sink }
    }

    pub fn chain(&self) -> &RuleEngineChain {
        &self.chain
    }

    /// Dispatch one event through the whole chain.
    ///
    /// Instances run strictly in configured order. The first code that is
    /// not the continuation sentinel terminates the walk, success or error,
    /// and later instances are never invoked. A chain exhausted on
    /// continuations is an implicit success with no issuing instance.
    pub fn dispatch(&self, event: &PolicyEvent) -> DispatchOutcome {
        for instance in self.chain.instances() {
            let code = self.invoke(instance, event);
            match classify(code) {
                CodeClass::Continuation => continue,
                CodeClass::TerminalSuccess | CodeClass::TerminalError => {
                    let outcome = DispatchOutcome::terminal(code, instance.name());
                    tracing::debug!(
                        pep = %event.name,
                        instance = %instance.name(),
                        code,
                        "dispatch terminated"
                    );
                    return outcome;
                }
            }
        }
        DispatchOutcome::implicit_success()
    }

    /// Dispatch one event to a single named instance, skipping the rest of
    /// the chain. Used for targeted submissions and delayed executions.
    ///
    /// A continuation from the target means the instance declined; with no
    /// further instances in play that is an implicit success.
    pub fn dispatch_to_instance(
        &self,
        instance_name: &str,
        event: &PolicyEvent,
    ) -> Result<DispatchOutcome, EngineError> {
        let instance = self.chain.get(instance_name).ok_or_else(|| {
            EngineError::Config(ConfigError::UnknownInstance {
                instance: instance_name.to_string(),
            })
        })?;

        let code = self.invoke(instance, event);
        match classify(code) {
            CodeClass::Continuation => Ok(DispatchOutcome::implicit_success()),
            CodeClass::TerminalSuccess | CodeClass::TerminalError => {
                Ok(DispatchOutcome::terminal(code, instance.name()))
            }
        }
    }

    /// Invoke one instance and record its code through the sink.
    ///
    /// The sink sees the line before the code is acted on; an engine-level
    /// error is folded into its numeric code and recorded the same way.
    fn invoke(&self, instance: &ChainInstance, event: &PolicyEvent) -> i64 {
        let code = match instance.engine().handle(event) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(
                    instance = %instance.name(),
                    pep = %event.name,
                    error = %e,
                    "rule engine reported an error"
                );
                e.error_code()
            }
        };
        self.sink.code_returned(instance.name(), &event.name, code);
        code
    }
}
