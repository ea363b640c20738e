//! Probe types and structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default expected status code.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default deadline for a whole probe (all attempts included).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP method used for a probe.
///
/// Only GET and POST are supported; anything else normalizes to GET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    /// Parse a method name, falling back to GET for unknown values.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "POST" => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl From<String> for HttpMethod {
    fn from(value: String) -> Self {
        Self::parse_lossy(&value)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint probe configuration.
///
/// The URL is the identity of an endpoint: two specs with the same URL share
/// one history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Target URL
    pub url: String,

    /// HTTP method
    #[serde(default)]
    pub method: HttpMethod,

    /// Deadline for the whole probe, retries included
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Expected status code
    #[serde(default = "default_expected_status", rename = "status")]
    pub expected_status: u16,

    /// Substring the response body must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_content: Option<String>,

    /// Retries after the first attempt
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between attempts
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

impl EndpointSpec {
    /// Create a GET spec for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            timeout: DEFAULT_TIMEOUT,
            expected_status: DEFAULT_EXPECTED_STATUS,
            expected_content: None,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_expected_content(mut self, content: impl Into<String>) -> Self {
        self.expected_content = Some(content.into());
        self
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Expected body substring, if one is configured and non-empty.
    pub fn expected_content(&self) -> Option<&str> {
        self.expected_content.as_deref().filter(|c| !c.is_empty())
    }
}

/// Kind of probe failure, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    StatusMismatch,
    ContentMismatch,
    TimeoutExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport-error",
            FailureKind::StatusMismatch => "status-mismatch",
            FailureKind::ContentMismatch => "content-mismatch",
            FailureKind::TimeoutExhausted => "timeout-exhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FailureDescriptor {
    /// DNS, connect, TLS, malformed request or cancellation
    TransportError { message: String },

    /// Status code differs from the expected one, or is in the error range
    StatusMismatch { got: u16, want: u16 },

    /// Expected substring absent from the response body
    ContentMismatch { expected: String },

    /// Deadline reached before the retry sequence could finish
    TimeoutExhausted {
        attempts: u32,
        last: Box<FailureDescriptor>,
    },
}

impl FailureDescriptor {
    pub fn transport(message: impl fmt::Display) -> Self {
        FailureDescriptor::TransportError {
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FailureDescriptor::TransportError { .. } => FailureKind::Transport,
            FailureDescriptor::StatusMismatch { .. } => FailureKind::StatusMismatch,
            FailureDescriptor::ContentMismatch { .. } => FailureKind::ContentMismatch,
            FailureDescriptor::TimeoutExhausted { .. } => FailureKind::TimeoutExhausted,
        }
    }
}

impl fmt::Display for FailureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureDescriptor::TransportError { message } => {
                write!(f, "request failed: {}", message)
            }
            FailureDescriptor::StatusMismatch { got, .. } if *got >= 400 => {
                write!(f, "received error status code: {}", got)
            }
            FailureDescriptor::StatusMismatch { got, want } => {
                write!(f, "unexpected status code (got: {}, want: {})", got, want)
            }
            FailureDescriptor::ContentMismatch { expected } => {
                write!(f, "expected content not found: {:?}", expected)
            }
            FailureDescriptor::TimeoutExhausted { attempts, last } => {
                write!(f, "timeout reached after {} attempts: {}", attempts, last)
            }
        }
    }
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Endpoint URL
    pub url: String,

    /// Method the endpoint was probed with
    pub method: HttpMethod,

    /// Status code the endpoint was expected to return
    pub expected_status: u16,

    /// Observed status code (0 if no response was received)
    pub status: u16,

    /// When the probe started
    pub started_at: DateTime<Utc>,

    /// How long the probe took
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Failure reason, `None` on success
    pub failure: Option<FailureDescriptor>,
}

impl ProbeOutcome {
    /// Create a successful outcome
    pub fn success(
        spec: &EndpointSpec,
        status: u16,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            url: spec.url.clone(),
            method: spec.method,
            expected_status: spec.expected_status,
            status,
            started_at,
            duration,
            failure: None,
        }
    }

    /// Create a failed outcome
    pub fn failed(
        spec: &EndpointSpec,
        status: u16,
        started_at: DateTime<Utc>,
        duration: Duration,
        failure: FailureDescriptor,
    ) -> Self {
        Self {
            failure: Some(failure),
            ..Self::success(spec, status, started_at, duration)
        }
    }

    /// Check if the outcome counts as a success
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.status < 400 && self.status == self.expected_status
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(FailureDescriptor::kind)
    }

    /// Human-readable failure message, empty on success
    pub fn error_message(&self) -> String {
        self.failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}
