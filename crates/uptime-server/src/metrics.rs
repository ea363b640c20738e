//! Prometheus metrics for the uptime server.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uptime::{ProbeOutcome, SweepSummary};

/// Labels for per-endpoint metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabels {
    /// Endpoint URL
    pub url: String,
}

/// Labels for probe result metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ProbeLabels {
    /// Endpoint URL
    pub url: String,
    /// Result (success, or the failure kind)
    pub result: String,
}

/// Metrics registry with all uptime server metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    // Per-endpoint metrics
    /// Terminal probe outcomes
    probes_total: Family<ProbeLabels, Counter>,
    /// Probe duration, retries included
    probe_duration_seconds: Family<EndpointLabels, Histogram>,

    // Sweep metrics
    /// Completed sweeps
    sweeps_total: Counter,
    /// Time from sweep launch until its last probe finished
    sweep_duration_seconds: Histogram,
    /// Endpoints in the configuration
    endpoints_configured: Gauge,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let probes_total = Family::<ProbeLabels, Counter>::default();
        registry.register(
            "uptime_probes",
            "Total probes by terminal result",
            probes_total.clone(),
        );

        let probe_duration_seconds =
            Family::<EndpointLabels, Histogram>::new_with_constructor(|| {
                // 1ms to ~30s
                Histogram::new(exponential_buckets(0.001, 2.0, 16))
            });
        registry.register(
            "uptime_probe_duration_seconds",
            "Probe duration in seconds, retries included",
            probe_duration_seconds.clone(),
        );

        let sweeps_total = Counter::default();
        registry.register(
            "uptime_sweeps",
            "Total completed sweeps",
            sweeps_total.clone(),
        );

        let sweep_duration_seconds = Histogram::new(exponential_buckets(0.01, 2.0, 14));
        registry.register(
            "uptime_sweep_duration_seconds",
            "Sweep duration in seconds",
            sweep_duration_seconds.clone(),
        );

        let endpoints_configured = Gauge::default();
        registry.register(
            "uptime_endpoints_configured",
            "Number of configured endpoints",
            endpoints_configured.clone(),
        );

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            sweeps_total,
            sweep_duration_seconds,
            endpoints_configured,
        }
    }

    /// Record one terminal probe outcome
    pub fn record_probe(&self, outcome: &ProbeOutcome) {
        let result = match outcome.failure_kind() {
            Some(kind) => kind.as_str(),
            None if outcome.is_success() => "success",
            None => "status-mismatch",
        };

        self.probes_total
            .get_or_create(&ProbeLabels {
                url: outcome.url.clone(),
                result: result.to_string(),
            })
            .inc();

        self.probe_duration_seconds
            .get_or_create(&EndpointLabels {
                url: outcome.url.clone(),
            })
            .observe(outcome.duration.as_secs_f64());
    }

    /// Record a completed sweep and every outcome in it
    pub fn record_sweep(&self, summary: &SweepSummary) {
        for outcome in &summary.outcomes {
            self.record_probe(outcome);
        }
        self.sweeps_total.inc();
        self.sweep_duration_seconds
            .observe(summary.elapsed.as_secs_f64());
    }

    pub fn set_endpoints(&self, count: usize) {
        self.endpoints_configured.set(count as i64);
    }

    /// Encode in Prometheus text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    /// Record every sweep published on `sweeps` until the channel closes
    pub fn watch(
        self: Arc<Self>,
        mut sweeps: broadcast::Receiver<Arc<SweepSummary>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match sweeps.recv().await {
                    Ok(summary) => self.record_sweep(&summary),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Metrics recorder lagged, sweeps not recorded");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Sweep channel closed, metrics recorder exiting");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
