//! Runtime assembly: configuration, chain, queue, and delay server under
//! one facade.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use repf_core::config::ServerConfig;
use repf_core::delay::DelayedRuleEntry;
use repf_core::errors::ServerError;
use repf_core::event::PolicyEvent;
use repf_core::outcome::DispatchOutcome;
use repf_core::sink::{ReturnCodeSink, TracingSink};
use repf_core::traits::DelayEnqueue;
use repf_engine::chain::RuleEngineChain;
use repf_engine::dispatcher::PepDispatcher;
use repf_engine::ops::OperationRegistry;
use repf_engine::registry::PluginRegistry;
use repf_engine::submission::{parse_submission, Submission};
use repf_storage::DelayQueue;

use crate::delay_server::DelayServer;

/// What became of a rule submission.
#[derive(Debug)]
pub enum Submitted {
    /// Deferred onto the delay queue; the id names the entry.
    Queued(i64),
    /// Resolved synchronously through the chain.
    Completed(DispatchOutcome),
}

/// Result of running a host operation between its pre and post hooks.
#[derive(Debug)]
pub enum OperationRun<T> {
    /// The pre hook reported an error; the operation never ran and the
    /// post hook never fired.
    Vetoed(DispatchOutcome),
    /// The operation ran; the post hook outcome rides along.
    Ran { result: T, post: DispatchOutcome },
}

/// The assembled framework: one chain generation, one queue, one delay
/// server.
///
/// Reconfiguration goes through [`RepfRuntime::restart`], which rebuilds
/// the chain from the configuration file while the queue and its entries
/// stay in place.
pub struct RepfRuntime {
    config_path: PathBuf,
    ops: Arc<OperationRegistry>,
    sink: Arc<dyn ReturnCodeSink>,
    queue: Arc<DelayQueue>,
    dispatcher: Arc<PepDispatcher>,
    server: Option<DelayServer>,
}

impl RepfRuntime {
    /// Bring the runtime up: load configuration, open the queue, recover
    /// interrupted entries, build the chain, start the delay server.
    pub fn bootstrap(
        config_path: &Path,
        queue_path: &Path,
        ops: Arc<OperationRegistry>,
    ) -> Result<Self, ServerError> {
        Self::bootstrap_with_sink(config_path, queue_path, ops, Arc::new(TracingSink))
    }

    /// Bootstrap with a custom return-code sink in place of the tracing
    /// one.
    pub fn bootstrap_with_sink(
        config_path: &Path,
        queue_path: &Path,
        ops: Arc<OperationRegistry>,
        sink: Arc<dyn ReturnCodeSink>,
    ) -> Result<Self, ServerError> {
        let config = ServerConfig::load(config_path)?;
        let queue = Arc::new(DelayQueue::open(queue_path)?);
        queue.recover_interrupted()?;

        let dispatcher = Arc::new(build_dispatcher(&config, &ops, &queue, &sink)?);
        let server = DelayServer::spawn(
            queue.clone(),
            dispatcher.clone(),
            config.sleep_interval(),
        );

        tracing::info!(
            instances = dispatcher.chain().len(),
            "rule engine runtime started"
        );
        Ok(Self {
            config_path: config_path.to_path_buf(),
            ops,
            sink,
            queue,
            dispatcher,
            server: Some(server),
        })
    }

    /// The current chain generation.
    pub fn chain(&self) -> &RuleEngineChain {
        self.dispatcher.chain()
    }

    /// Dispatch a policy event through the chain.
    pub fn dispatch(&self, event: &PolicyEvent) -> DispatchOutcome {
        self.dispatcher.dispatch(event)
    }

    /// Submit rule text on behalf of a client.
    ///
    /// Delay-form submissions are queued and acknowledged immediately.
    /// Everything else is raised as the exec-rule-text event against the
    /// target instance (or the default target) and resolved before
    /// returning.
    pub fn submit_rule(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> Result<Submitted, ServerError> {
        match parse_submission(text)? {
            Submission::Delayed(mut rule) => {
                // A targeting tag inside the rule text wins over the
                // submission-level target.
                if rule.target_instance.is_none() {
                    if let Some(target) = target {
                        rule = rule.with_target(target);
                    }
                }
                let id = self.queue.enqueue(rule)?;
                Ok(Submitted::Queued(id))
            }
            Submission::Document(_) | Submission::Text(_) => {
                let event = PolicyEvent::exec_rule_text(text);
                let outcome = match target
                    .or_else(|| self.dispatcher.chain().default_target_instance())
                {
                    Some(name) => self.dispatcher.dispatch_to_instance(name, &event)?,
                    None => self.dispatcher.dispatch(&event),
                };
                Ok(Submitted::Completed(outcome))
            }
        }
    }

    /// Run a host operation between its `<stem>_pre` and `<stem>_post`
    /// hooks. An error outcome from the pre hook vetoes the operation and
    /// suppresses the post hook.
    pub fn run_operation<T>(
        &self,
        pep_stem: &str,
        op: impl FnOnce() -> T,
    ) -> OperationRun<T> {
        let pre = self.dispatch(&PolicyEvent::new(&format!("{pep_stem}_pre")));
        if pre.is_error() {
            tracing::warn!(
                pep = pep_stem,
                code = pre.code,
                instance = pre.issuer(),
                "operation vetoed by pre hook"
            );
            return OperationRun::Vetoed(pre);
        }
        let result = op();
        let post = self.dispatch(&PolicyEvent::new(&format!("{pep_stem}_post")));
        OperationRun::Ran { result, post }
    }

    /// Every delay queue entry, in execution order.
    pub fn queue_entries(&self) -> Result<Vec<DelayedRuleEntry>, ServerError> {
        Ok(self.queue.entries()?)
    }

    /// Fetch one delay queue entry by id.
    pub fn queue_entry(&self, id: i64) -> Result<DelayedRuleEntry, ServerError> {
        Ok(self.queue.get(id)?)
    }

    /// Remove a pending entry before the delay server claims it.
    pub fn cancel_entry(&self, id: i64) -> Result<(), ServerError> {
        Ok(self.queue.cancel(id)?)
    }

    /// Entry counts per status.
    pub fn queue_counts(&self) -> Result<Vec<(String, i64)>, ServerError> {
        Ok(self.queue.counts()?)
    }

    /// Reload the configuration file and rebuild the chain against the
    /// same queue. Entries enqueued before the restart survive it.
    pub fn restart(&mut self) -> Result<(), ServerError> {
        let Some(server) = self.server.take() else {
            return Err(ServerError::NotRunning);
        };
        server.shutdown();
        self.dispatcher.chain().stop();

        let config = ServerConfig::load(&self.config_path)?;
        self.dispatcher =
            Arc::new(build_dispatcher(&config, &self.ops, &self.queue, &self.sink)?);
        self.queue.recover_interrupted()?;
        self.server = Some(DelayServer::spawn(
            self.queue.clone(),
            self.dispatcher.clone(),
            config.sleep_interval(),
        ));

        tracing::info!(
            instances = self.dispatcher.chain().len(),
            "rule engine runtime restarted"
        );
        Ok(())
    }

    /// Stop the delay server and the chain. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(server) = self.server.take() {
            server.shutdown();
            self.dispatcher.chain().stop();
            tracing::info!("rule engine runtime stopped");
        }
    }
}

impl fmt::Debug for RepfRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepfRuntime")
            .field("config_path", &self.config_path)
            .field("running", &self.server.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for RepfRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_dispatcher(
    config: &ServerConfig,
    ops: &Arc<OperationRegistry>,
    queue: &Arc<DelayQueue>,
    sink: &Arc<dyn ReturnCodeSink>,
) -> Result<PepDispatcher, ServerError> {
    let enqueuer: Arc<dyn DelayEnqueue> = queue.clone();
    let registry = PluginRegistry::with_builtins(ops.clone(), enqueuer);
    let chain = RuleEngineChain::build(config, &registry)?;
    Ok(PepDispatcher::new(Arc::new(chain), sink.clone()))
}
