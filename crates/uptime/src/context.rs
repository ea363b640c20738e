//! Deadline and cancellation passed down to every probe suspension point.

use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Why a context finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    DeadlineExceeded,
    Cancelled,
}

impl Done {
    pub fn as_str(&self) -> &'static str {
        match self {
            Done::DeadlineExceeded => "deadline exceeded",
            Done::Cancelled => "probe cancelled",
        }
    }
}

// Stand-in deadline for timeouts past what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline-bound execution context for one probe.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl ProbeContext {
    /// Context expiring `timeout` from now, cancelled together with `parent`.
    pub fn new(timeout: Duration, parent: &CancellationToken) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self {
            deadline,
            cancel: parent.child_token(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Non-blocking check, cancellation wins over the deadline.
    pub fn state(&self) -> Option<Done> {
        if self.cancel.is_cancelled() {
            Some(Done::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(Done::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the deadline passes or the context is cancelled.
    pub async fn done(&self) -> Done {
        tokio::select! {
            _ = self.cancel.cancelled() => Done::Cancelled,
            _ = sleep_until(self.deadline) => Done::DeadlineExceeded,
        }
    }

    /// Sleep for `delay` unless the context finishes first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), Done> {
        if let Some(done) = self.state() {
            return Err(done);
        }
        tokio::select! {
            done = self.done() => Err(done),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
