//! Authentication methods and token inspection.

use crate::{
    client::{LOG_TARGET, Vault},
    error::{ApiErrorKind, VaultResult},
    models::{AuthResponse, TokenData},
};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::{info, instrument, warn};

/// A way of obtaining a Vault token.
#[derive(Clone)]
pub enum AuthMethod {
    /// A pre-shared token, used as is.
    Token(SecretString),
    /// An `AppRole` role id and secret id, exchanged for a token.
    AppRole {
        /// Role identifier
        role_id: String,
        /// Secret identifier
        secret_id: SecretString,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            Self::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"[REDACTED]")
                .finish(),
        }
    }
}

impl AuthMethod {
    /// Authenticate with a pre-shared token.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token(SecretString::from(token.into()))
    }

    /// Authenticate with `AppRole` credentials.
    #[must_use]
    pub fn approle(role_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        Self::AppRole {
            role_id: role_id.into(),
            secret_id: SecretString::from(secret_id.into()),
        }
    }

    /// Short name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::AppRole { .. } => "approle",
        }
    }

    async fn login(&self, vault: &Vault) -> VaultResult<SecretString> {
        match self {
            Self::Token(token) => Ok(token.clone()),
            Self::AppRole { role_id, secret_id } => {
                let body = serde_json::json!({
                    "role_id": role_id,
                    "secret_id": secret_id.expose_secret(),
                });
                let response = vault
                    .execute(Method::POST, "auth/approle/login", Some(&body))
                    .await?;
                let auth: AuthResponse = serde_json::from_slice(&response.bytes().await?)?;
                info!(
                    target: LOG_TARGET,
                    lease_secs = auth.auth.lease_duration,
                    "Logged in with approle"
                );
                Ok(SecretString::from(auth.auth.client_token))
            }
        }
    }
}

impl Vault {
    /// Log in with `method` and keep the resulting token.
    ///
    /// A login the server rejects, or a server that cannot be reached, is
    /// logged and reported as `Ok(false)`; the previous token, if any, is
    /// kept. Only local failures such as an undecodable response are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the login response cannot be decoded.
    #[instrument(target = "vault_client", skip_all, fields(method = method.name()))]
    pub async fn authenticate(&mut self, method: &AuthMethod) -> VaultResult<bool> {
        let login = method.login(self).await;
        match login {
            Ok(token) => {
                self.set_token(token);
                Ok(true)
            }
            Err(e) if e.is_remote() => {
                warn!(target: LOG_TARGET, error = %e, "Failed login to Vault");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Look up the current token.
    ///
    /// Returns `Ok(None)` when Vault answers forbidden, i.e. the token is
    /// expired, revoked or was never valid.
    ///
    /// # Errors
    ///
    /// Returns any other failure of the lookup.
    pub async fn get_token_data(&self) -> VaultResult<Option<TokenData>> {
        match self.read_data::<TokenData>("auth/token/lookup-self").await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_api_kind(ApiErrorKind::Forbidden) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_credentials() {
        let method = AuthMethod::approle("role-1234", "secret-5678");
        let debug = format!("{method:?}");
        assert!(debug.contains("role-1234"));
        assert!(!debug.contains("secret-5678"));

        let method = AuthMethod::token("hvs.root");
        assert!(!format!("{method:?}").contains("hvs.root"));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(AuthMethod::token("t").name(), "token");
        assert_eq!(AuthMethod::approle("r", "s").name(), "approle");
    }
}
