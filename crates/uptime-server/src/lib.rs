//! Uptime server: periodic HTTP endpoint probing with a read-only query API.
//!
//! # Components
//!
//! - **Config**: YAML configuration with validation (domains and their endpoints)
//! - **Server**: opens the history store, runs the scheduler and serves the API
//! - **HTTP server**: `/endpoints`, `/endpoint/history`, `/domain/history`, `/metrics`
//! - **Metrics**: Prometheus counters and histograms fed by sweep summaries

pub mod config;
pub mod http_server;
pub mod metrics;
pub mod server;
pub mod types;

pub use config::{Config, ConfigError, LogFormat};
pub use http_server::{ApiError, ApiServer, AppState, router};
pub use metrics::MetricsRegistry;
pub use server::UptimeServer;
pub use types::{Domain, ServerConfig};
