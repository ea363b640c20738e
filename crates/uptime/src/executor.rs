//! Single-attempt probe execution.

use crate::context::ProbeContext;
use crate::types::{EndpointSpec, FailureDescriptor, ProbeOutcome};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, warn};

/// Performs exactly one probe attempt.
///
/// Implementations never retry and never touch storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// Perform one attempt against `spec`, bounded by `ctx`
    async fn execute(&self, spec: &EndpointSpec, ctx: &ProbeContext) -> ProbeOutcome;

    /// Get the name of this executor
    fn name(&self) -> &'static str;
}

/// HTTP probe executor
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Create a new HTTP probe executor
    pub fn new() -> common::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("uptime/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(common::Error::client)?;

        Ok(Self { client })
    }

    /// Create an executor around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbe {
    async fn execute(&self, spec: &EndpointSpec, ctx: &ProbeContext) -> ProbeOutcome {
        let started_at = Utc::now();
        let start = Instant::now();

        let url = match reqwest::Url::parse(&spec.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %spec.url, error = %e, "Invalid probe URL");
                return ProbeOutcome::failed(
                    spec,
                    0,
                    started_at,
                    start.elapsed(),
                    FailureDescriptor::transport(format!("failed to create request: {}", e)),
                );
            }
        };

        let request = self.client.request(spec.method.into(), url);

        let response = tokio::select! {
            done = ctx.done() => Err(done.as_str().to_string()),
            result = request.send() => result.map_err(|e| e.to_string()),
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let duration = start.elapsed();
                debug!(url = %spec.url, error = %e, "Probe request failed");
                return ProbeOutcome::failed(
                    spec,
                    0,
                    started_at,
                    duration,
                    FailureDescriptor::transport(e),
                );
            }
        };

        let status = response.status().as_u16();

        // Error-range responses never count as success, even when expected.
        if status >= 400 || status != spec.expected_status {
            let duration = start.elapsed();
            debug!(url = %spec.url, status, want = spec.expected_status, "Unexpected status code");
            return ProbeOutcome::failed(
                spec,
                status,
                started_at,
                duration,
                FailureDescriptor::StatusMismatch {
                    got: status,
                    want: spec.expected_status,
                },
            );
        }

        if let Some(expected) = spec.expected_content() {
            let body = tokio::select! {
                done = ctx.done() => Err(done.as_str().to_string()),
                result = response.bytes() => result.map_err(|e| e.to_string()),
            };
            let duration = start.elapsed();

            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    debug!(url = %spec.url, error = %e, "Failed to read response body");
                    return ProbeOutcome::failed(
                        spec,
                        status,
                        started_at,
                        duration,
                        FailureDescriptor::transport(format!("failed to read body: {}", e)),
                    );
                }
            };

            if !String::from_utf8_lossy(&body).contains(expected) {
                debug!(url = %spec.url, status, "Expected content not found");
                return ProbeOutcome::failed(
                    spec,
                    status,
                    started_at,
                    duration,
                    FailureDescriptor::ContentMismatch {
                        expected: expected.to_string(),
                    },
                );
            }

            debug!(url = %spec.url, status, duration_ms = duration.as_millis(), "Probe successful");
            return ProbeOutcome::success(spec, status, started_at, duration);
        }

        let duration = start.elapsed();
        debug!(url = %spec.url, status, duration_ms = duration.as_millis(), "Probe successful");
        ProbeOutcome::success(spec, status, started_at, duration)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
