//! Runtime configuration and query API response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uptime::{DEFAULT_HISTORY_SIZE, EndpointSpec, HistoryStats, ProbeOutcome};

/// Endpoints grouped under a domain name
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub name: String,
    pub endpoints: Vec<EndpointSpec>,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Query API listen address
    pub listen_addr: String,

    /// Bound on graceful HTTP shutdown
    pub shutdown_timeout: Duration,

    /// History database file
    pub db_path: PathBuf,

    /// Outcomes kept per URL
    pub history_size: usize,

    /// Time between sweeps
    pub interval: Duration,

    /// Wait for in-flight probes before cancelling them on shutdown
    pub drain_timeout: Duration,

    /// Expose /metrics
    pub metrics_enabled: bool,

    /// Configured domains, in file order
    pub domains: Vec<Domain>,
}

impl ServerConfig {
    /// Every configured endpoint, domains concatenated in order
    pub fn endpoints(&self) -> Vec<EndpointSpec> {
        self.domains
            .iter()
            .flat_map(|d| d.endpoints.iter().cloned())
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout: Duration::from_secs(5),
            db_path: PathBuf::from("endpoints.db"),
            history_size: DEFAULT_HISTORY_SIZE,
            interval: Duration::from_secs(3600),
            drain_timeout: Duration::from_secs(30),
            metrics_enabled: true,
            domains: Vec::new(),
        }
    }
}

/// `GET /endpoints`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsResponse {
    pub urls: Vec<String>,
}

/// One stored outcome as served by the query API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: u16,
    pub expected: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Failure kind, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl From<&ProbeOutcome> for HistoryEntry {
    fn from(outcome: &ProbeOutcome) -> Self {
        Self {
            status: outcome.status,
            expected: outcome.expected_status,
            error: outcome.error_message(),
            kind: outcome.failure_kind().map(|k| k.as_str().to_string()),
            timestamp: outcome.started_at,
            duration_ms: outcome.duration.as_millis() as u64,
        }
    }
}

/// `GET /endpoint/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub url: String,
    pub history: Vec<HistoryEntry>,
    pub stats: HistoryStats,
}

impl HistoryResponse {
    /// Build a response from a stored window, `None` if it is empty
    pub fn from_history(url: impl Into<String>, history: &[ProbeOutcome]) -> Option<Self> {
        let stats = HistoryStats::from_outcomes(history)?;
        Some(Self {
            url: url.into(),
            history: history.iter().map(HistoryEntry::from).collect(),
            stats,
        })
    }
}

/// `GET /domain/history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHistoryResponse {
    pub domain: String,
    pub endpoints: Vec<HistoryResponse>,
}

/// Error body returned by the query API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
