//! Timer-driven sweeps over a fixed endpoint set.
//!
//! Every tick launches one sweep; a sweep spawns one task per endpoint and
//! publishes a [`SweepSummary`] once all of them finish. Sweeps are not
//! gated on each other: a slow sweep may still be running when the next
//! tick fires, and both run side by side.

use crate::handler::ProbeHandler;
use crate::types::{EndpointSpec, ProbeOutcome};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Buffered sweep summaries per subscriber
const SWEEP_CHANNEL_SIZE: usize = 16;

/// Result of one sweep over every endpoint
#[derive(Debug, Clone)]
pub struct SweepSummary {
    /// Sequence number, starting at 1
    pub sweep: u64,

    /// When the sweep was launched
    pub started_at: DateTime<Utc>,

    /// Time until the last endpoint finished
    pub elapsed: Duration,

    /// Terminal outcome of each endpoint, in completion order
    pub outcomes: Vec<ProbeOutcome>,
}

impl SweepSummary {
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }
}

/// State shared by the dispatch loop and every sweep it launches
#[derive(Clone)]
struct Shared {
    handler: Arc<ProbeHandler>,
    endpoints: Arc<[EndpointSpec]>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    sweeps: broadcast::Sender<Arc<SweepSummary>>,
    sequence: Arc<AtomicU64>,
}

/// Probe scheduler
pub struct Scheduler {
    shared: Shared,
    interval: Duration,
    stop_signal: CancellationToken,
    started: AtomicBool,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(
        handler: Arc<ProbeHandler>,
        interval: Duration,
        endpoints: Vec<EndpointSpec>,
    ) -> Self {
        let (sweeps, _) = broadcast::channel(SWEEP_CHANNEL_SIZE);

        Self {
            shared: Shared {
                handler,
                endpoints: endpoints.into(),
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
                sweeps,
                sequence: Arc::new(AtomicU64::new(0)),
            },
            interval,
            stop_signal: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Tie in-flight probes to an external cancellation signal
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.shared.cancel = cancel;
        self
    }

    pub fn endpoints(&self) -> &[EndpointSpec] {
        &self.shared.endpoints
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receive a summary each time a sweep completes
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SweepSummary>> {
        self.shared.sweeps.subscribe()
    }

    /// Start sweeping: once immediately, then every interval.
    ///
    /// A stopped scheduler cannot be restarted.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already started");
            return;
        }

        let shared = self.shared.clone();
        let period = self.interval;
        let stop_signal = self.stop_signal.clone();

        self.shared.tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_signal.cancelled() => {
                        info!("Scheduler stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let sweep = shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                        shared.tracker.spawn(Self::sweep(shared.clone(), sweep));
                    }
                }
            }
        });

        info!(
            endpoints = self.shared.endpoints.len(),
            interval = ?self.interval,
            "Scheduler started"
        );
    }

    /// Stop issuing sweeps and wait for every dispatched probe to finish.
    ///
    /// In-flight probes are not cancelled.
    pub async fn stop(&self) {
        self.stop_signal.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        info!("Scheduler stopped");
    }

    /// [`stop`](Self::stop), cancelling in-flight probes if they have not
    /// drained within `grace`. Returns whether they drained on their own.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if tokio::time::timeout(grace, self.stop()).await.is_ok() {
            return true;
        }

        warn!(grace = ?grace, "Probes still running, cancelling");
        self.shared.cancel.cancel();
        self.shared.tracker.wait().await;
        false
    }

    /// Run one sweep now and wait for it to complete
    pub async fn check_all(&self) -> Arc<SweepSummary> {
        let sweep = self.shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Self::sweep(self.shared.clone(), sweep).await
    }

    async fn sweep(shared: Shared, sweep: u64) -> Arc<SweepSummary> {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!(sweep, endpoints = shared.endpoints.len(), "Sweep started");

        let workers: Vec<_> = shared
            .endpoints
            .iter()
            .cloned()
            .map(|spec| {
                let handler = shared.handler.clone();
                let cancel = shared.cancel.child_token();
                shared
                    .tracker
                    .spawn(async move { handler.handle(&spec, &cancel).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(workers.len());
        for worker in workers {
            match worker.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(sweep, error = %e, "Probe task failed"),
            }
        }

        let summary = Arc::new(SweepSummary {
            sweep,
            started_at,
            elapsed: start.elapsed(),
            outcomes,
        });

        info!(
            sweep,
            successes = summary.successes(),
            failures = summary.failures(),
            elapsed_ms = summary.elapsed.as_millis(),
            "Sweep complete"
        );

        // No subscribers is fine
        let _ = shared.sweeps.send(summary.clone());
        summary
    }
}
