//! Operational client for the HashiCorp Vault HTTP API.
//!
//! [`Vault`] wraps the endpoints an operator needs to stand up and run a
//! cluster: authentication, health and seal probes, idempotent provisioning
//! of audit devices, auth methods and secrets engines, policies and
//! `AppRole` roles, the PKI intermediate CA lifecycle, raft snapshots and
//! membership, and transit-based auto-unseal credentials.
//!
//! ```no_run
//! use vault_ops_client::{AuthMethod, SecretsBackend, Vault, VaultConfig};
//!
//! # async fn run() -> vault_ops_client::VaultResult<()> {
//! let mut vault = Vault::new(VaultConfig::from_env())?;
//! if vault.authenticate(&AuthMethod::token("hvs.example")).await? {
//!     vault.enable_secrets_engine(SecretsBackend::Pki, "charm-pki").await?;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod autounseal;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod mounts;
pub mod pki;
pub mod policy;
pub mod raft;

pub use auth::AuthMethod;
pub use autounseal::{
    AUTOUNSEAL_TOKEN_PERIOD, AutounsealCredentials, autounseal_approle_name, autounseal_key_name,
    autounseal_policy_name,
};
pub use client::{LOG_TARGET, Vault};
pub use config::VaultConfig;
pub use error::{ApiError, ApiErrorKind, VaultError, VaultResult};
pub use models::{
    AuditDeviceType, AutopilotServer, Certificate, HealthStatus, RaftClusterState, RaftPeer,
    SealStatus, SecretIdInfo, SecretsBackend, TokenData,
};
pub use mounts::{AUDIT_PATH_IN_USE, MOUNT_PATH_IN_USE};
pub use policy::{AppRoleOptions, render_policy_template};
pub use raft::RAFT_STATE_ENDPOINT;
