//! Health, initialization and seal probes.
//!
//! The boolean health probes fold every failure into `false` and log it, so
//! "unreachable" and "unhealthy" look the same to the caller. Use
//! [`Vault::health_status`] where the difference matters.

use crate::{
    client::{LOG_TARGET, Vault},
    error::VaultResult,
    models::{HealthStatus, InitStatus, SealStatus},
};
use reqwest::Method;
use tracing::error;

const TRANSIT_SEAL_TYPE: &str = "transit";

impl Vault {
    /// Read the node's state from the health endpoint.
    ///
    /// The endpoint encodes state in its status code, so any HTTP response is
    /// a result here. With `standby_ok`, standbys answer as active.
    ///
    /// # Errors
    ///
    /// Returns [`crate::VaultError::Unavailable`] if no response is received.
    pub async fn health_status(&self, standby_ok: bool) -> VaultResult<HealthStatus> {
        let mut request = self.request(Method::GET, "sys/health");
        if standby_ok {
            request = request.query(&[("standbyok", "true")]);
        }
        let response = self.send(request).await?;
        Ok(HealthStatus::from_status(response.status().as_u16()))
    }

    async fn probe_health(&self, standby_ok: bool) -> Option<HealthStatus> {
        match self.health_status(standby_ok).await {
            Ok(status) => Some(status),
            Err(e) => {
                error!(target: LOG_TARGET, error = %e, "Error while checking Vault health status");
                None
            }
        }
    }

    /// Whether the API answers at all, whatever the node's state.
    pub async fn is_api_available(&self) -> bool {
        self.probe_health(true).await.is_some()
    }

    /// Whether the node is initialized, unsealed and active.
    pub async fn is_active(&self) -> bool {
        self.probe_health(false).await == Some(HealthStatus::Active)
    }

    /// Whether the node is initialized, unsealed and either active or standby.
    pub async fn is_active_or_standby(&self) -> bool {
        matches!(
            self.probe_health(false).await,
            Some(HealthStatus::Active | HealthStatus::Standby)
        )
    }

    /// Whether the server has been initialized.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn is_initialized(&self) -> VaultResult<bool> {
        let status: InitStatus = self.read_json("sys/init").await?;
        Ok(status.initialized)
    }

    /// Read the seal status.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn seal_status(&self) -> VaultResult<SealStatus> {
        self.read_json("sys/seal-status").await
    }

    /// Whether the server is sealed.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn is_sealed(&self) -> VaultResult<bool> {
        Ok(self.seal_status().await?.sealed)
    }

    /// Whether a seal migration is pending.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn needs_migration(&self) -> VaultResult<bool> {
        Ok(self.seal_status().await?.migration)
    }

    /// The seal mechanism, e.g. `shamir` or `transit`.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn get_seal_type(&self) -> VaultResult<String> {
        Ok(self.seal_status().await?.seal_type)
    }

    /// Whether the server is auto-unsealed by a transit backend.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn is_seal_type_transit(&self) -> VaultResult<bool> {
        Ok(self.get_seal_type().await? == TRANSIT_SEAL_TYPE)
    }
}
