//! Periodic HTTP endpoint probing with bounded retries and a capped,
//! durable history per endpoint.
//!
//! # Components
//!
//! - **Executor** ([`HttpProbe`]): one HTTP request under a deadline, classified
//!   against the expected status and body content
//! - **Handler** ([`ProbeHandler`]): retries the executor until success, attempt
//!   exhaustion or deadline, and persists exactly one outcome per call
//! - **History** ([`HistoryStore`]): redb-backed, per-URL sliding window of outcomes
//! - **Scheduler** ([`Scheduler`]): sweeps every endpoint concurrently on a fixed interval
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use uptime::{EndpointSpec, HistoryStore, HttpProbe, ProbeHandler, Scheduler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = HistoryStore::open("endpoints.db".as_ref(), 48)?;
//! let handler = Arc::new(ProbeHandler::new(Arc::new(HttpProbe::new()?), store.clone()));
//!
//! let endpoints = vec![
//!     EndpointSpec::new("https://example.com").with_expected_content("Example Domain"),
//! ];
//!
//! let scheduler = Scheduler::new(handler, Duration::from_secs(3600), endpoints);
//! scheduler.start();
//!
//! // ... later
//! scheduler.stop().await;
//! let history = store.read("https://example.com")?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod executor;
pub mod handler;
pub mod history;
pub mod scheduler;
pub mod stats;
pub mod types;

pub use context::{Done, ProbeContext};
pub use executor::{HttpProbe, ProbeExecutor};
pub use handler::ProbeHandler;
pub use history::{DEFAULT_HISTORY_SIZE, HistoryStore, StoreError, StoreResult};
pub use scheduler::{Scheduler, SweepSummary};
pub use stats::HistoryStats;
pub use types::{EndpointSpec, FailureDescriptor, FailureKind, HttpMethod, ProbeOutcome};
