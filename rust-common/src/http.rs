//! Centralized HTTP client configuration and building.
//!
//! This module provides a standardized way to create HTTP clients bound to a
//! TLS trust decision: either a pinned CA bundle or no verification at all.

use crate::error::PlatformError;
use reqwest::{Certificate, Client, ClientBuilder};
use std::path::PathBuf;
use std::time::Duration;

/// How server certificates are verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsTrust {
    /// Trust only the CA certificates in this PEM bundle.
    CaBundle(PathBuf),
    /// Accept any server certificate.
    InsecureSkipVerify,
}

impl TlsTrust {
    /// Build a trust setting from an optional CA bundle path.
    ///
    /// `None` means certificate verification is disabled.
    #[must_use]
    pub fn from_ca_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::InsecureSkipVerify, Self::CaBundle)
    }
}

/// HTTP client configuration.
///
/// Timeouts are unset by default so the transport's own defaults apply.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Total request timeout (default: none)
    pub timeout: Option<Duration>,
    /// Connection timeout (default: none)
    pub connect_timeout: Option<Duration>,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Server certificate verification
    pub tls: TlsTrust,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("vault-ops-client/", env!("CARGO_PKG_VERSION")).to_string(),
            tls: TlsTrust::InsecureSkipVerify,
        }
    }
}

impl HttpConfig {
    /// Set a total request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set a custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set custom pool settings.
    #[must_use]
    pub const fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Set the TLS trust mode.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsTrust) -> Self {
        self.tls = tls;
        self
    }
}

/// Build a configured HTTP client.
///
/// Creates a reqwest client with rustls TLS, connection pooling, and
/// the specified trust configuration. A CA bundle is read from disk once,
/// here; later changes to the file are not picked up.
///
/// # Errors
///
/// Returns an error if a timeout is zero, if the CA bundle cannot be read or
/// parsed, or if the client cannot be built.
///
/// # Examples
///
/// ```
/// use rust_common::{HttpConfig, TlsTrust, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_tls(TlsTrust::InsecureSkipVerify);
/// let client = build_http_client(&config);
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let timeouts = [
        ("timeout", config.timeout),
        ("connect_timeout", config.connect_timeout),
    ];
    for (name, timeout) in timeouts {
        if timeout == Some(Duration::ZERO) {
            return Err(PlatformError::invalid_input(format!("{name} must be non-zero")));
        }
    }

    let mut builder = ClientBuilder::new()
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    builder = match &config.tls {
        TlsTrust::CaBundle(path) => {
            let pem = std::fs::read(path).map_err(|e| PlatformError::io(path, e))?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|e| PlatformError::tls(format!("{}: {e}", path.display())))?;
            builder.add_root_certificate(certificate)
        }
        TlsTrust::InsecureSkipVerify => builder.danger_accept_invalid_certs(true),
    };

    builder.build().map_err(PlatformError::Http)
}
