//! Vault facade and its HTTP transport.
//!
//! [`Vault`] owns one configured HTTP client and, once authenticated, one
//! token. Every operation is a single awaited request/response; nothing is
//! cached, retried or run in the background. The operations themselves live
//! in the sibling modules as further `impl Vault` blocks.

use crate::{
    config::VaultConfig,
    error::{ApiError, VaultError, VaultResult},
    models::{DataResponse, ErrorResponse},
};
use reqwest::{Client, Method, RequestBuilder, Response};
use rust_common::build_http_client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;
use url::Url;

/// Tracing target shared by every event this crate emits.
pub const LOG_TARGET: &str = "vault_client";

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Client facade over the Vault HTTP API.
pub struct Vault {
    config: VaultConfig,
    http: Client,
    token: Option<SecretString>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault")
            .field("addr", &self.config.addr)
            .field("ca_cert_path", &self.config.ca_cert_path)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Create a new, unauthenticated Vault client.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the address is not an
    /// `http`/`https` URL, or a platform error if the CA bundle cannot be
    /// loaded.
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        let addr = Url::parse(&config.addr).map_err(|e| {
            VaultError::InvalidConfig(format!("invalid address {}: {e}", config.addr))
        })?;
        if !matches!(addr.scheme(), "http" | "https") {
            return Err(VaultError::InvalidConfig(format!(
                "unsupported scheme {} in {}",
                addr.scheme(),
                config.addr
            )));
        }

        let http = build_http_client(&config.http_config())?;

        Ok(Self {
            config,
            http,
            token: None,
        })
    }

    /// Server address this client is bound to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.config.addr
    }

    /// Token currently held, for callers that persist it.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub(crate) fn set_token(&mut self, token: SecretString) {
        self.token = Some(token);
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.addr.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Start a request to an API path, relative to `/v1/`.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token.expose_secret()),
            None => request,
        }
    }

    /// Send a request, without interpreting the status.
    pub(crate) async fn send(&self, request: RequestBuilder) -> VaultResult<Response> {
        request
            .send()
            .await
            .map_err(|e| VaultError::unavailable(e.to_string()))
    }

    /// Send a request and turn a non-success status into [`VaultError::Api`].
    pub(crate) async fn dispatch(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> VaultResult<Response> {
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            debug!(
                target: LOG_TARGET,
                request = label,
                status = status.as_u16(),
                "Vault request succeeded"
            );
            return Ok(response);
        }
        Err(api_error(response, label).await)
    }

    /// Issue `method` on `path` with an optional JSON body.
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> VaultResult<Response> {
        let label = format!("{method} {path}");
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.dispatch(request, &label).await
    }

    /// GET a response body that is not wrapped in `data`.
    pub(crate) async fn read_json<T: DeserializeOwned>(&self, path: &str) -> VaultResult<T> {
        let response = self.execute(Method::GET, path, None).await?;
        decode(response, path).await
    }

    /// GET the `data` member of a response.
    pub(crate) async fn read_data<T: DeserializeOwned>(&self, path: &str) -> VaultResult<T> {
        let envelope: DataResponse<T> = self.read_json(path).await?;
        Ok(envelope.data)
    }

    /// LIST the `data` member of a response.
    pub(crate) async fn list_data<T: DeserializeOwned>(&self, path: &str) -> VaultResult<T> {
        let request = self.request(Method::GET, path).query(&[("list", "true")]);
        let response = self.dispatch(request, &format!("LIST {path}")).await?;
        let envelope: DataResponse<T> = decode(response, path).await?;
        Ok(envelope.data)
    }

    /// Write a JSON body and return the `data` member of the response.
    pub(crate) async fn write_data<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &serde_json::Value,
    ) -> VaultResult<T> {
        let response = self.execute(method, path, Some(body)).await?;
        let envelope: DataResponse<T> = decode(response, path).await?;
        Ok(envelope.data)
    }

    /// Issue a request whose response body, if any, is irrelevant.
    pub(crate) async fn write(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> VaultResult<()> {
        self.execute(method, path, body).await.map(drop)
    }

    /// GET a response body as text.
    pub(crate) async fn read_text(&self, path: &str) -> VaultResult<String> {
        let response = self.execute(Method::GET, path, None).await?;
        Ok(response.text().await?)
    }

    /// GET a response body as raw bytes.
    pub(crate) async fn read_bytes(&self, path: &str) -> VaultResult<Vec<u8>> {
        let response = self.execute(Method::GET, path, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// POST raw bytes.
    pub(crate) async fn write_bytes(&self, path: &str, body: Vec<u8>) -> VaultResult<()> {
        let request = self
            .request(Method::POST, path)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body);
        let label = format!("POST {path}");
        self.dispatch(request, &label).await.map(drop)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> VaultResult<T> {
    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(VaultError::unexpected(format!("{path} returned no content")));
    }
    Ok(serde_json::from_slice(&body)?)
}

async fn api_error(response: Response, label: &str) -> VaultError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let errors = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.errors,
        Err(_) if body.trim().is_empty() => Vec::new(),
        Err(_) => vec![body.trim().to_string()],
    };
    ApiError::new(status, errors, label).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unparsable_address() {
        let err = Vault::new(VaultConfig::new("not a url", None)).unwrap_err();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = Vault::new(VaultConfig::new("ftp://vault:8200", None)).unwrap_err();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_ca_bundle_fails_construction() {
        let config = VaultConfig::new("https://vault:8200", None)
            .with_ca_cert_path("/nonexistent/vault-ops-client/ca.pem");
        let err = Vault::new(config).unwrap_err();
        assert!(matches!(err, VaultError::Platform(_)));
    }

    #[test]
    fn test_url_joins_api_path() {
        let vault = Vault::new(VaultConfig::new("https://vault:8200/", None)).unwrap();
        assert_eq!(vault.url("sys/health"), "https://vault:8200/v1/sys/health");
        assert_eq!(vault.url("/pki/ca/pem"), "https://vault:8200/v1/pki/ca/pem");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut vault = Vault::new(VaultConfig::new("https://vault:8200", None)).unwrap();
        vault.set_token(SecretString::from("hvs.super-secret-token"));
        let debug = format!("{vault:?}");
        assert!(!debug.contains("hvs.super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_new_client_has_no_token() {
        let vault = Vault::new(VaultConfig::new("http://127.0.0.1:8200", None)).unwrap();
        assert!(vault.token().is_none());
        assert_eq!(vault.addr(), "http://127.0.0.1:8200");
    }
}
