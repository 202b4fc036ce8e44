//! The delay server: a background sweeper over the persistent queue.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use repf_core::delay::{unix_time_ms, DelayedRuleEntry};
use repf_core::errors::{RepfErrorCode, ServerError};
use repf_core::event::PolicyEvent;
use repf_engine::dispatcher::PepDispatcher;
use repf_storage::DelayQueue;

/// Entries examined per sweep.
const SWEEP_BATCH: usize = 64;

/// Owns the sweeper thread. Sweeps once at spawn, then once per interval
/// until shut down; shutdown waits for an in-flight sweep to finish.
pub struct DelayServer {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl DelayServer {
    pub fn spawn(
        queue: Arc<DelayQueue>,
        dispatcher: Arc<PepDispatcher>,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            tracing::info!(
                interval_ms = interval.as_millis() as u64,
                "delay server started"
            );
            loop {
                match poll_once(&queue, &dispatcher) {
                    Ok(0) => {}
                    Ok(executed) => tracing::debug!(executed, "delay queue sweep finished"),
                    Err(e) => tracing::error!(error = %e, "delay queue sweep failed"),
                }
                match shutdown_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
            tracing::info!("delay server stopped");
        });
        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Stop the sweeper and join its thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.shutdown_tx.try_send(());
            let _ = handle.join();
        }
    }
}

impl Drop for DelayServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One sweep: claim every currently eligible entry and execute it.
///
/// Losing a claim is not an error; some other claimant owns that entry and
/// the sweep moves on. Returns how many entries this sweep executed.
pub fn poll_once(
    queue: &DelayQueue,
    dispatcher: &PepDispatcher,
) -> Result<usize, ServerError> {
    let now = unix_time_ms();
    let mut executed = 0;
    for entry in queue.eligible_before(now, SWEEP_BATCH)? {
        if !queue.claim(entry.id)? {
            continue;
        }
        execute_entry(queue, dispatcher, &entry)?;
        executed += 1;
    }
    Ok(executed)
}

/// Run one claimed entry and record its outcome.
///
/// The payload is raised as the delayed-execution event against the entry's
/// target instance, falling back to the chain's default target.
fn execute_entry(
    queue: &DelayQueue,
    dispatcher: &PepDispatcher,
    entry: &DelayedRuleEntry,
) -> Result<(), ServerError> {
    let event = PolicyEvent::delayed_execution(&entry.payload);
    let target = entry
        .target_instance
        .as_deref()
        .or_else(|| dispatcher.chain().default_target_instance());

    let outcome = match target {
        Some(name) => match dispatcher.dispatch_to_instance(name, &event) {
            Ok(outcome) => outcome,
            Err(e) => {
                // The target instance left the chain, e.g. through a
                // configuration reload after the entry was enqueued.
                queue.fail(entry.id, e.error_code(), &e.to_string())?;
                tracing::warn!(id = entry.id, error = %e, "delayed rule target is gone");
                return Ok(());
            }
        },
        None => dispatcher.dispatch(&event),
    };

    if outcome.is_error() {
        let error = format!("instance '{}' returned {}", outcome.issuer(), outcome.code);
        queue.fail(entry.id, outcome.code, &error)?;
        tracing::warn!(
            id = entry.id,
            code = outcome.code,
            instance = outcome.issuer(),
            "delayed rule failed"
        );
    } else {
        queue.complete(entry.id, outcome.code)?;
        tracing::info!(id = entry.id, code = outcome.code, "delayed rule executed");
    }
    Ok(())
}
