//! Common error types for the failover components.
//!
//! Each crate keeps its own detailed error enum and converts into [`Error`]
//! at the boundary where a failure becomes fatal for the whole run.

use std::fmt;

/// A specialized Result type for failover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for failover operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Hetzner API error: {0}")]
    Api(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new metadata error.
    pub fn metadata(msg: impl fmt::Display) -> Self {
        Error::Metadata(msg.to_string())
    }

    /// Create a new API error.
    pub fn api(msg: impl fmt::Display) -> Self {
        Error::Api(msg.to_string())
    }

    /// Create a new logging error.
    pub fn logging(msg: impl fmt::Display) -> Self {
        Error::Logging(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        assert_eq!(
            Error::config("Config file is empty").to_string(),
            "Configuration error: Config file is empty"
        );
        assert_eq!(
            Error::metadata("timeout").to_string(),
            "Metadata error: timeout"
        );
        assert_eq!(Error::api("boom").to_string(), "Hetzner API error: boom");
    }
}
