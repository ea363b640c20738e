//! Retry controller: drives an executor until success, attempt exhaustion
//! or deadline, then persists the terminal outcome.

use crate::context::{Done, ProbeContext};
use crate::executor::ProbeExecutor;
use crate::history::HistoryStore;
use crate::types::{EndpointSpec, FailureDescriptor, ProbeOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs probes with retries and records one outcome per call
pub struct ProbeHandler {
    executor: Arc<dyn ProbeExecutor>,
    store: HistoryStore,
}

impl ProbeHandler {
    /// Create a new handler
    pub fn new(executor: Arc<dyn ProbeExecutor>, store: HistoryStore) -> Self {
        Self { executor, store }
    }

    /// Store the handler records into
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Probe `spec` with retries and persist the terminal outcome.
    ///
    /// Store failures are logged and do not affect the returned outcome.
    pub async fn handle(&self, spec: &EndpointSpec, cancel: &CancellationToken) -> ProbeOutcome {
        let outcome = self.probe(spec, cancel).await;

        if let Err(e) = self.store.append_async(outcome.clone()).await {
            error!(url = %spec.url, error = %e, "Failed to store probe outcome");
        }

        outcome
    }

    /// Run the retry sequence without persisting.
    pub async fn probe(&self, spec: &EndpointSpec, cancel: &CancellationToken) -> ProbeOutcome {
        let ctx = ProbeContext::new(spec.timeout, cancel);
        let started_at = Utc::now();
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let mut outcome = self.executor.execute(spec, &ctx).await;

            if outcome.is_success() {
                if attempts > 1 {
                    info!(url = %spec.url, attempts, "Probe recovered after retry");
                }
                return outcome;
            }

            let last = outcome.failure.clone().unwrap_or(FailureDescriptor::StatusMismatch {
                got: outcome.status,
                want: spec.expected_status,
            });

            if attempts > spec.retry_attempts {
                outcome.failure.get_or_insert_with(|| last.clone());
                warn!(
                    url = %spec.url,
                    attempts,
                    status = outcome.status,
                    error = %last,
                    "Probe failed, retries exhausted"
                );
                return outcome;
            }

            debug!(
                url = %spec.url,
                attempt = attempts,
                max = spec.retry_attempts,
                error = %last,
                "Probe attempt failed, waiting to retry"
            );

            if let Err(done) = ctx.sleep(spec.retry_delay).await {
                let failure = match done {
                    Done::DeadlineExceeded => FailureDescriptor::TimeoutExhausted {
                        attempts,
                        last: Box::new(last),
                    },
                    Done::Cancelled => FailureDescriptor::transport(format!(
                        "{} after {} attempts: {}",
                        done.as_str(),
                        attempts,
                        last
                    )),
                };
                warn!(url = %spec.url, attempts, error = %failure, "Probe retry interrupted");
                return ProbeOutcome::failed(spec, 0, started_at, start.elapsed(), failure);
            }
        }
    }
}
