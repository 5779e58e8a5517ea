//! Centralized transport error type.
//!
//! Errors raised while building or driving the HTTP transport, before any
//! Vault-specific interpretation of a response takes place.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for transport setup and connectivity.
///
/// All errors are classified as either retryable or non-retryable,
/// which helps callers decide whether to retry failed operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP client failure
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A file required by the transport could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TLS trust configuration is unusable
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Only connection refusals and timeouts are transient; configuration
    /// problems fail the same way every time.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::invalid_input("bad url");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Io { .. } | Self::Tls(_) | Self::InvalidInput(_) => false,
        }
    }

    /// Create an I/O error for the given path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a TLS configuration error with the given message.
    #[must_use]
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_retryable_errors() {
        assert!(!PlatformError::invalid_input("test").is_retryable());
        assert!(!PlatformError::tls("test").is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!PlatformError::io("/tmp/ca.pem", io).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PlatformError::invalid_input("timeout must be non-zero");
        assert_eq!(err.to_string(), "Invalid input: timeout must be non-zero");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PlatformError::io("/etc/vault/ca.pem", io);
        assert_eq!(err.to_string(), "Failed to read /etc/vault/ca.pem: no such file");
    }
}
