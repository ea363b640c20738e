//! Statistics derived from a history window. Never stored.

use crate::types::ProbeOutcome;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Aggregate view over one URL's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Number of outcomes in the window
    pub total_checks: usize,

    /// Outcomes without a failure
    pub successful_checks: usize,

    /// successful / total × 100
    pub uptime_percentage: f64,

    /// Mean duration in milliseconds (integer division)
    pub average_response_ms: u64,

    /// Start time of the most recent outcome (RFC 3339)
    pub last_check: String,
}

impl HistoryStats {
    /// Compute statistics, or `None` for an empty history.
    pub fn from_outcomes(history: &[ProbeOutcome]) -> Option<Self> {
        let last = history.last()?;
        let total = history.len();

        let successful = history.iter().filter(|o| o.failure.is_none()).count();
        let total_ms: u128 = history.iter().map(|o| o.duration.as_millis()).sum();

        Some(Self {
            total_checks: total,
            successful_checks: successful,
            uptime_percentage: successful as f64 / total as f64 * 100.0,
            average_response_ms: (total_ms / total as u128) as u64,
            last_check: last.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndpointSpec, FailureDescriptor};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    #[test]
    fn test_empty_history_has_no_stats() {
        assert!(HistoryStats::from_outcomes(&[]).is_none());
    }

    #[test]
    fn test_stats_update() {
        let spec = EndpointSpec::new("https://example.com");
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 15).unwrap();

        let history = vec![
            ProbeOutcome::success(&spec, 200, t0, Duration::from_millis(100)),
            ProbeOutcome::failed(
                &spec,
                0,
                t1,
                Duration::from_millis(50),
                FailureDescriptor::transport("connection refused"),
            ),
            ProbeOutcome::success(&spec, 200, t2, Duration::from_millis(51)),
        ];

        let stats = HistoryStats::from_outcomes(&history).unwrap();
        assert_eq!(stats.total_checks, 3);
        assert_eq!(stats.successful_checks, 2);
        assert!((stats.uptime_percentage - 66.666_666).abs() < 0.001);
        // 201ms / 3
        assert_eq!(stats.average_response_ms, 67);
        assert_eq!(stats.last_check, "2024-05-01T14:30:15Z");
    }
}
