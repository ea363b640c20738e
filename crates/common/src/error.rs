//! Common error types for the uptime crates.

use std::fmt;

/// A specialized Result type for uptime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for uptime operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new HTTP client error.
    pub fn client(msg: impl fmt::Display) -> Self {
        Error::Client(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_format_message() {
        assert_eq!(
            Error::client("builder failed").to_string(),
            "HTTP client error: builder failed"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_serialization_conversion() {
        let json = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
