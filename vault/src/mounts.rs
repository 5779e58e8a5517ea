//! Idempotent provisioning of audit devices, auth methods and secrets engines.
//!
//! Vault reports an existing mount only through the wording of a 400 error,
//! so "already enabled" is recognised by an exact message prefix. Anything
//! else the server rejects is returned as an error.

use crate::{
    client::{LOG_TARGET, Vault},
    error::{ApiErrorKind::{self, InvalidRequest}, VaultResult},
    models::{AuditDeviceType, SecretsBackend},
};
use reqwest::Method;
use tracing::{info, instrument};

/// Message prefix Vault uses when an audit device path is taken.
pub const AUDIT_PATH_IN_USE: &str = "path already in use";

/// Message prefix Vault uses when an auth or secrets mount path is taken.
pub const MOUNT_PATH_IN_USE: &str = "path is already in use";

const APPROLE: &str = "approle";

impl Vault {
    /// Enable an audit device writing to `path`, unless already enabled.
    ///
    /// # Errors
    ///
    /// Returns any rejection other than "path already in use".
    #[instrument(target = "vault_client", skip(self))]
    pub async fn enable_audit_device(
        &self,
        device_type: AuditDeviceType,
        path: &str,
    ) -> VaultResult<()> {
        let body = serde_json::json!({
            "type": device_type.as_str(),
            "options": { "file_path": path },
        });
        let result = self
            .write(
                Method::POST,
                &format!("sys/audit/{}", device_type.as_str()),
                Some(&body),
            )
            .await;

        match result {
            Ok(()) => {
                info!(target: LOG_TARGET, "Enabled audit device `{device_type}` for path `{path}`");
                Ok(())
            }
            Err(e) if e.has_single_error_with_prefix(InvalidRequest, AUDIT_PATH_IN_USE) => {
                info!(target: LOG_TARGET, "Audit device already enabled.");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Enable the `AppRole` auth method, unless already enabled.
    ///
    /// # Errors
    ///
    /// Returns any rejection other than "path is already in use".
    #[instrument(target = "vault_client", skip(self))]
    pub async fn enable_approle_auth_method(&self) -> VaultResult<()> {
        let body = serde_json::json!({ "type": APPROLE });
        let result = self
            .write(Method::POST, &format!("sys/auth/{APPROLE}"), Some(&body))
            .await;

        match result {
            Ok(()) => {
                info!(target: LOG_TARGET, "Enabled approle auth method.");
                Ok(())
            }
            Err(e) if e.has_single_error_with_prefix(InvalidRequest, MOUNT_PATH_IN_USE) => {
                info!(target: LOG_TARGET, "Approle already enabled.");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Mount a secrets engine at `path`, unless something is mounted there.
    ///
    /// # Errors
    ///
    /// Returns any rejection other than "path is already in use".
    #[instrument(target = "vault_client", skip(self))]
    pub async fn enable_secrets_engine(
        &self,
        backend: SecretsBackend,
        path: &str,
    ) -> VaultResult<()> {
        let body = serde_json::json!({
            "type": backend.as_str(),
            "description": format!("Charm created '{backend}' backend"),
        });
        let result = self
            .write(Method::POST, &format!("sys/mounts/{path}"), Some(&body))
            .await;

        match result {
            Ok(()) => {
                info!(target: LOG_TARGET, "Enabled {backend} backend");
                Ok(())
            }
            Err(e) if e.has_single_error_with_prefix(InvalidRequest, MOUNT_PATH_IN_USE) => {
                info!(target: LOG_TARGET, "{backend} backend already enabled");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Unmount the secrets engine at `path`; a missing mount is not an error.
    ///
    /// # Errors
    ///
    /// Returns any rejection other than "not found".
    #[instrument(target = "vault_client", skip(self))]
    pub async fn disable_secrets_engine(&self, path: &str) -> VaultResult<()> {
        let mount_path = format!("sys/mounts/{path}");
        match self.write(Method::DELETE, &mount_path, None).await {
            Ok(()) => {
                info!(target: LOG_TARGET, "Disabled secret engine at {path}");
                Ok(())
            }
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => {
                info!(target: LOG_TARGET, "Secret engine at `{path}` is already disabled");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether a secrets engine is mounted at `path`.
    ///
    /// # Errors
    ///
    /// Returns any failure of the mount listing.
    pub async fn is_secret_engine_enabled(&self, path: &str) -> VaultResult<bool> {
        let mounts: serde_json::Value = self.read_json("sys/mounts").await?;
        let key = format!("{}/", path.trim_end_matches('/'));
        // Current servers nest mounts under `data`; older ones list them at the top level.
        let listing = mounts.get("data").unwrap_or(&mounts);
        Ok(listing.get(&key).is_some())
    }
}
