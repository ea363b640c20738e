//! Logging utilities for the uptime crates.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize tracing with sensible defaults.
///
/// Uses the RUST_LOG environment variable to control log levels.
/// Default level is INFO.
pub fn init() {
    init_with_level("info");
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json() {
    init_json_with_level("info");
}

/// Initialize human-readable tracing, falling back to `level` when RUST_LOG is unset.
pub fn init_with_level(level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter(level))
        .init();
}

/// Initialize JSON tracing, falling back to `level` when RUST_LOG is unset.
pub fn init_json_with_level(level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(filter(level))
        .init();
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
