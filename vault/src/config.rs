//! Vault client configuration.

use rust_common::{HttpConfig, TlsTrust};
use std::path::PathBuf;
use std::time::Duration;

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address, e.g. `https://10.0.0.4:8200`
    pub addr: String,
    /// CA bundle used to verify the server; `None` disables verification
    pub ca_cert_path: Option<PathBuf>,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout: Option<Duration>,
    /// Connect timeout; `None` leaves the transport default in place
    pub connect_timeout: Option<Duration>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            addr: "https://127.0.0.1:8200".to_string(),
            ca_cert_path: None,
            timeout: None,
            connect_timeout: None,
            user_agent: HttpConfig::default().user_agent,
        }
    }
}

impl VaultConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(addr: impl Into<String>, ca_cert_path: Option<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            ca_cert_path,
            ..Default::default()
        }
    }

    /// Read `VAULT_ADDR` and `VAULT_CACERT` from the environment, falling back
    /// to the defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: std::env::var("VAULT_ADDR").unwrap_or(defaults.addr),
            ca_cert_path: std::env::var_os("VAULT_CACERT").map(PathBuf::from),
            ..defaults
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Pin TLS verification to a CA bundle.
    #[must_use]
    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Set user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// HTTP transport settings derived from this configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
            tls: TlsTrust::from_ca_path(self.ca_cert_path.clone()),
            ..HttpConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.addr, "https://127.0.0.1:8200");
        assert!(config.ca_cert_path.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_no_ca_path_disables_verification() {
        let config = VaultConfig::new("https://vault:8200", None);
        assert_eq!(config.http_config().tls, TlsTrust::InsecureSkipVerify);
    }

    #[test]
    fn test_ca_path_pins_trust() {
        let config = VaultConfig::new("https://vault:8200", None)
            .with_ca_cert_path("/var/lib/vault/ca.pem")
            .with_timeout(Duration::from_secs(5));
        let http = config.http_config();
        assert_eq!(
            http.tls,
            TlsTrust::CaBundle(PathBuf::from("/var/lib/vault/ca.pem"))
        );
        assert_eq!(http.timeout, Some(Duration::from_secs(5)));
    }
}
