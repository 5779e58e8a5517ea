//! Auto-unseal credentials for other Vault clusters.
//!
//! Each relation, identified by an integer id, gets a transit key, a policy
//! scoped to that key and an `AppRole` bound to the policy. All three names
//! derive from the relation id alone, so teardown needs nothing but the id.

use crate::{
    client::{LOG_TARGET, Vault},
    error::{ApiErrorKind, VaultResult},
    policy::AppRoleOptions,
};
use reqwest::Method;
use secrecy::SecretString;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Token period of auto-unseal approles; forces frequent re-authentication.
pub const AUTOUNSEAL_TOKEN_PERIOD: &str = "60s";

/// Credentials handed to a cluster that unseals through this one.
#[derive(Clone)]
pub struct AutounsealCredentials {
    /// Transit key the remote cluster seals with
    pub key_name: String,
    /// Role id of the remote cluster's approle
    pub role_id: String,
    /// Secret id of the remote cluster's approle
    pub secret_id: SecretString,
}

impl fmt::Debug for AutounsealCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutounsealCredentials")
            .field("key_name", &self.key_name)
            .field("role_id", &self.role_id)
            .field("secret_id", &"[REDACTED]")
            .finish()
    }
}

/// Policy name for a relation.
#[must_use]
pub fn autounseal_policy_name(relation_id: u64) -> String {
    format!("charm-autounseal-{relation_id}")
}

/// `AppRole` name for a relation.
#[must_use]
pub fn autounseal_approle_name(relation_id: u64) -> String {
    format!("charm-autounseal-{relation_id}")
}

/// Transit key name for a relation.
#[must_use]
pub fn autounseal_key_name(relation_id: u64) -> String {
    relation_id.to_string()
}

impl Vault {
    async fn create_autounseal_key(&self, mount: &str, relation_id: u64) -> VaultResult<String> {
        let key_name = autounseal_key_name(relation_id);
        let path = format!("{mount}/keys/{key_name}");
        let body = serde_json::json!({});
        self.write(Method::POST, &path, Some(&body)).await?;
        debug!(target: LOG_TARGET, mount, key_name, "Created a new autounseal key");
        Ok(key_name)
    }

    // Never called: deleting the key before the remote cluster has migrated
    // off it leaves that cluster's data permanently sealed.
    #[allow(dead_code)]
    async fn destroy_autounseal_key(&self, mount: &str, key_name: &str) -> VaultResult<()> {
        let path = format!("{mount}/keys/{key_name}");
        self.write(Method::DELETE, &path, None).await
    }

    /// Create the transit key, policy and approle for a relation.
    ///
    /// The policy file is rendered with `mount` and `key_name`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; earlier steps are not undone.
    #[instrument(target = "vault_client", skip(self, policy_path))]
    pub async fn create_autounseal_credentials(
        &self,
        relation_id: u64,
        mount: &str,
        policy_path: impl AsRef<Path>,
    ) -> VaultResult<AutounsealCredentials> {
        let key_name = self.create_autounseal_key(mount, relation_id).await?;

        let policy_name = autounseal_policy_name(relation_id);
        self.configure_policy(
            &policy_name,
            policy_path,
            &[("mount", mount), ("key_name", key_name.as_str())],
        )
        .await?;

        let role_name = autounseal_approle_name(relation_id);
        let options = AppRoleOptions::default()
            .with_policies([policy_name])
            .with_token_period(AUTOUNSEAL_TOKEN_PERIOD);
        let role_id = self.configure_approle(&role_name, &options).await?;
        let secret_id = self.generate_role_secret_id(&role_name, &[]).await?;

        info!(target: LOG_TARGET, "Created autounseal credentials for relation {relation_id}");
        Ok(AutounsealCredentials {
            key_name,
            role_id,
            secret_id,
        })
    }

    /// Delete the approle and policy of a relation.
    ///
    /// The transit key is kept: the remote cluster's data stays sealed under
    /// it until a seal migration has moved it elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the first failing deletion's error.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn destroy_autounseal_credentials(
        &self,
        relation_id: u64,
        mount: &str,
    ) -> VaultResult<()> {
        let role_name = autounseal_approle_name(relation_id);
        let policy_name = autounseal_policy_name(relation_id);
        self.delete_approle(&role_name).await?;
        self.delete_policy(&policy_name).await?;
        debug!(
            target: LOG_TARGET,
            mount,
            key_name = %autounseal_key_name(relation_id),
            "Keeping autounseal transit key"
        );
        Ok(())
    }

    /// Whether a transit key exists on the mount.
    ///
    /// # Errors
    ///
    /// Returns any failure of the read other than a missing key.
    pub async fn transit_key_exists(&self, mount: &str, name: &str) -> VaultResult<bool> {
        let path = format!("{mount}/keys/{name}");
        match self.execute(Method::GET, &path, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_api_kind(ApiErrorKind::InvalidPath) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
