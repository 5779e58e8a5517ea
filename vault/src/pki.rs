//! PKI secrets engine: intermediate CA issuance, roles and signing.
//!
//! The workflow is linear. Generate an intermediate CSR on the mount, have it
//! signed elsewhere, install the result, create a role restricted to allowed
//! domains, then sign end-entity CSRs against that role.

use crate::{
    client::{LOG_TARGET, Vault},
    error::{ApiErrorKind, VaultError, VaultResult},
    models::{Certificate, CsrData, KeyList, PkiRoleData, SignedCertificateData},
};
use reqwest::Method;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_FOLLOWS_LATEST_ISSUER: &str = "default_follows_latest_issuer";

impl Vault {
    /// Whether the mount's CA certificate is exactly `certificate`.
    ///
    /// # Errors
    ///
    /// Returns any failure of the read.
    pub async fn is_intermediate_ca_set(
        &self,
        mount: &str,
        certificate: &str,
    ) -> VaultResult<bool> {
        Ok(self.get_intermediate_ca(mount).await? == certificate)
    }

    /// The mount's CA certificate, PEM, as stored by Vault.
    ///
    /// # Errors
    ///
    /// Returns any failure of the read.
    pub async fn get_intermediate_ca(&self, mount: &str) -> VaultResult<String> {
        self.read_text(&format!("{mount}/ca/pem")).await
    }

    /// Generate an intermediate CA key pair inside Vault and return its CSR.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn generate_pki_intermediate_ca_csr(
        &self,
        mount: &str,
        common_name: &str,
    ) -> VaultResult<String> {
        let body = serde_json::json!({ "common_name": common_name });
        let data: CsrData = self
            .write_data(
                Method::POST,
                &format!("{mount}/intermediate/generate/internal"),
                &body,
            )
            .await?;
        info!(target: LOG_TARGET, "Generated a CSR for the intermediate CA for the PKI backend");
        Ok(data.csr)
    }

    /// Install the externally signed intermediate CA certificate.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    #[instrument(target = "vault_client", skip(self, certificate))]
    pub async fn set_pki_intermediate_ca_certificate(
        &self,
        certificate: &str,
        mount: &str,
    ) -> VaultResult<()> {
        let body = serde_json::json!({ "certificate": certificate });
        self.write(
            Method::POST,
            &format!("{mount}/intermediate/set-signed"),
            Some(&body),
        )
        .await?;
        info!(target: LOG_TARGET, "Set the intermediate CA certificate for the PKI backend");
        Ok(())
    }

    /// Sign an end-entity CSR against `role`.
    ///
    /// Returns `Ok(None)` when Vault refuses the request as invalid, e.g.
    /// because the common name is outside the role's allowed domains.
    ///
    /// # Errors
    ///
    /// Returns any other failure of the request.
    #[instrument(target = "vault_client", skip(self, csr))]
    pub async fn sign_pki_certificate_signing_request(
        &self,
        mount: &str,
        role: &str,
        csr: &str,
        common_name: &str,
    ) -> VaultResult<Option<Certificate>> {
        let body = serde_json::json!({
            "csr": csr,
            "common_name": common_name,
        });
        let path = format!("{mount}/sign/{role}");
        let result = self
            .write_data::<SignedCertificateData>(Method::POST, &path, &body)
            .await;

        match result {
            Ok(data) => {
                info!(target: LOG_TARGET, "Signed a PKI certificate for {common_name}");
                Ok(Some(data.into()))
            }
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidRequest) => {
                warn!(target: LOG_TARGET, error = %e, "Error while signing PKI certificate");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Create or update a signing role limited to `allowed_domains` and
    /// their subdomains.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn create_or_update_pki_role(
        &self,
        role: &str,
        allowed_domains: &str,
        mount: &str,
    ) -> VaultResult<()> {
        let body = serde_json::json!({
            "allowed_domains": allowed_domains,
            "allow_subdomains": true,
        });
        let path = format!("{mount}/roles/{role}");
        self.write(Method::POST, &path, Some(&body)).await?;
        info!(target: LOG_TARGET, "Created a role for the PKI backend");
        Ok(())
    }

    /// Whether `role` exists on the mount.
    ///
    /// # Errors
    ///
    /// Returns any failure of the listing other than "no roles".
    pub async fn is_pki_role_created(&self, role: &str, mount: &str) -> VaultResult<bool> {
        match self.list_data::<KeyList>(&format!("{mount}/roles")).await {
            Ok(roles) => Ok(roles.keys.iter().any(|key| key == role)),
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `common_name` is one of the role's allowed domains.
    ///
    /// # Errors
    ///
    /// Returns any failure of the read other than a missing role.
    pub async fn is_common_name_allowed_in_pki_role(
        &self,
        role: &str,
        mount: &str,
        common_name: &str,
    ) -> VaultResult<bool> {
        let role_path = format!("{mount}/roles/{role}");
        match self.read_data::<PkiRoleData>(&role_path).await {
            Ok(data) => Ok(data.allowed_domains.iter().any(|domain| domain == common_name)),
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => {
                error!(
                    target: LOG_TARGET,
                    role, mount, "Role does not exist on the specified path."
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Make the mount's default issuer follow the newest issuer.
    ///
    /// Writes the issuer config only when it exists and does not already
    /// follow the latest issuer; a config that is missing or not yet
    /// populated is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NoIssuers`] if the mount has no issuers, or any
    /// failure of the config read or write.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn make_latest_pki_issuer_default(&self, mount: &str) -> VaultResult<()> {
        let first_issuer = match self.list_data::<KeyList>(&format!("{mount}/issuers")).await {
            Ok(issuers) => issuers.keys.into_iter().next(),
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => None,
            Err(e) => return Err(e),
        };
        let Some(first_issuer) = first_issuer else {
            error!(target: LOG_TARGET, mount, "No issuers found on the specified path");
            return Err(VaultError::NoIssuers(mount.to_string()));
        };

        let config_path = format!("{mount}/config/issuers");
        let config = match self.read_json::<serde_json::Value>(&config_path).await {
            Ok(config) => Some(config),
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => return Ok(()),
            Err(VaultError::UnexpectedResponse(_)) => None,
            Err(e) => return Err(e),
        };

        let follows_latest = config
            .as_ref()
            .and_then(|config| config.get("data"))
            .and_then(|data| data.get(DEFAULT_FOLLOWS_LATEST_ISSUER))
            .and_then(serde_json::Value::as_bool);
        match follows_latest {
            Some(true) => Ok(()),
            Some(false) => {
                debug!(target: LOG_TARGET, "Updating issuers config");
                let body = serde_json::json!({
                    "default_follows_latest_issuer": true,
                    "default": first_issuer,
                });
                self.write(Method::POST, &config_path, Some(&body)).await
            }
            None => {
                error!(target: LOG_TARGET, mount, "Issuers config is not yet created");
                Ok(())
            }
        }
    }
}
