//! Vault error types using thiserror 2.0.
//!
//! Server rejections are normalized into [`ApiError`] so callers match on a
//! kind and the server's messages instead of on HTTP plumbing.

use rust_common::PlatformError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a non-success response, by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// 400: malformed or rejected request
    InvalidRequest,
    /// 401: missing or unusable credentials
    Unauthorized,
    /// 403: token lacks permission, or is expired/invalid
    Forbidden,
    /// 404: nothing mounted or stored at the path
    InvalidPath,
    /// 412: request raced ahead of replication
    PreconditionFailed,
    /// 429: rate limited (also standby on some endpoints)
    RateLimitExceeded,
    /// 500: server-side failure
    InternalServerError,
    /// 501: server not initialized
    NotInitialized,
    /// 502: upstream failure
    BadGateway,
    /// 503: server sealed or down
    Sealed,
    /// Any other non-success status
    Unexpected,
}

impl ApiErrorKind {
    /// Classify an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::InvalidPath,
            412 => Self::PreconditionFailed,
            429 => Self::RateLimitExceeded,
            500 => Self::InternalServerError,
            501 => Self::NotInitialized,
            502 => Self::BadGateway,
            503 => Self::Sealed,
            _ => Self::Unexpected,
        }
    }
}

/// A request the server answered with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Status classification
    pub kind: ApiErrorKind,
    /// Raw HTTP status code
    pub status: u16,
    /// Messages from the response's `errors` array
    pub errors: Vec<String>,
    /// Request method and API path, for diagnostics
    pub request: String,
}

impl ApiError {
    /// Build an error from a status code and the server's messages.
    #[must_use]
    pub fn new(status: u16, errors: Vec<String>, request: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::from_status(status),
            status,
            errors,
            request: request.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} returned {}", self.request, self.status)?;
        if !self.errors.is_empty() {
            write!(f, ": {}", self.errors.join("; "))?;
        }
        Ok(())
    }
}

/// Vault client errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Vault could not be reached
    #[error("Vault unavailable: {0}")]
    Unavailable(String),

    /// Vault rejected the request
    #[error("Vault rejected request: {0}")]
    Api(ApiError),

    /// Response body could not be read
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Response decoded but lacked an expected field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Policy source file could not be read
    #[error("Failed to read policy {}: {source}", path.display())]
    PolicySource {
        /// Policy file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Policy template could not be rendered
    #[error("Invalid policy template: {0}")]
    PolicyTemplate(String),

    /// PKI mount has no issuers yet
    #[error("No issuers found on the specified path: {0}")]
    NoIssuers(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport setup error
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Check if error is retryable.
    ///
    /// The client never retries by itself; this only informs callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Api(api) => matches!(
                api.kind,
                ApiErrorKind::RateLimitExceeded | ApiErrorKind::BadGateway | ApiErrorKind::Sealed
            ),
            Self::Platform(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// The normalized server rejection, if this is one.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }

    /// Whether the server rejected the request with the given kind.
    #[must_use]
    pub fn is_api_kind(&self, kind: ApiErrorKind) -> bool {
        self.api().is_some_and(|api| api.kind == kind)
    }

    /// Whether the server answered with `kind` and exactly one error message
    /// starting with `prefix`.
    ///
    /// Vault reports "already enabled" conditions only through message text,
    /// so idempotent provisioning depends on these exact prefixes.
    #[must_use]
    pub fn has_single_error_with_prefix(&self, kind: ApiErrorKind, prefix: &str) -> bool {
        self.api().is_some_and(|api| {
            api.kind == kind && api.errors.len() == 1 && api.errors[0].starts_with(prefix)
        })
    }

    /// Whether the error is a server rejection or a connection failure, as
    /// opposed to a local decoding or configuration problem.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Api(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_body(),
            _ => false,
        }
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an unexpected response error.
    #[must_use]
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }
}

impl From<ApiError> for VaultError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

#[cfg(test)]
mod tests {
    use super::ApiErrorKind::InvalidRequest;
    use super::*;

    const IN_USE: &str = "path is already in use";

    fn rejected(status: u16, errors: &[&str]) -> VaultError {
        ApiError::new(
            status,
            errors.iter().map(ToString::to_string).collect(),
            "POST sys/mounts/pki",
        )
        .into()
    }

    #[test]
    fn test_error_display() {
        let err = VaultError::unavailable("connection refused");
        assert_eq!(err.to_string(), "Vault unavailable: connection refused");

        let err = rejected(400, &["path is already in use at pki/"]);
        assert_eq!(
            err.to_string(),
            "Vault rejected request: POST sys/mounts/pki returned 400: \
             path is already in use at pki/"
        );
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(ApiErrorKind::from_status(400), ApiErrorKind::InvalidRequest);
        assert_eq!(ApiErrorKind::from_status(403), ApiErrorKind::Forbidden);
        assert_eq!(ApiErrorKind::from_status(404), ApiErrorKind::InvalidPath);
        assert_eq!(ApiErrorKind::from_status(503), ApiErrorKind::Sealed);
        assert_eq!(ApiErrorKind::from_status(418), ApiErrorKind::Unexpected);
    }

    #[test]
    fn test_prefix_requires_single_message() {
        let err = rejected(400, &["path is already in use at pki/"]);
        assert!(err.has_single_error_with_prefix(InvalidRequest, IN_USE));

        let err = rejected(400, &["path is already in use at pki/", "another"]);
        assert!(!err.has_single_error_with_prefix(InvalidRequest, IN_USE));

        let err = rejected(400, &[]);
        assert!(!err.has_single_error_with_prefix(InvalidRequest, IN_USE));
    }

    #[test]
    fn test_prefix_requires_matching_kind() {
        let err = rejected(500, &["path is already in use at pki/"]);
        assert!(!err.has_single_error_with_prefix(InvalidRequest, IN_USE));
    }

    #[test]
    fn test_prefix_is_not_substring_match() {
        let err = rejected(400, &["audit: path already in use"]);
        assert!(!err.has_single_error_with_prefix(InvalidRequest, "path already in use"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(VaultError::unavailable("timeout").is_retryable());
        assert!(rejected(429, &[]).is_retryable());
        assert!(rejected(503, &["Vault is sealed"]).is_retryable());
        assert!(!rejected(400, &["bad"]).is_retryable());
        assert!(!VaultError::NoIssuers("pki".to_string()).is_retryable());
    }

    #[test]
    fn test_remote_classification() {
        assert!(VaultError::unavailable("refused").is_remote());
        assert!(rejected(400, &[]).is_remote());
        assert!(!VaultError::unexpected("missing role_id").is_remote());
        assert!(!VaultError::PolicyTemplate("bad".to_string()).is_remote());
    }

    #[test]
    fn test_from_platform_error() {
        let platform_err = PlatformError::tls("bad bundle");
        let vault_err: VaultError = platform_err.into();
        assert!(matches!(vault_err, VaultError::Platform(_)));
        assert!(!vault_err.is_retryable());
    }
}
