//! Common utilities and types shared across the uptime crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
