//! Value types exchanged with the Vault API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const TOKEN_ID_FIELD: &str = "id";

/// A certificate issued by the PKI secrets engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Issued certificate, PEM
    pub certificate: String,
    /// Issuing CA, PEM
    pub ca: String,
    /// CA chain, PEM, leaf-most first
    pub chain: Vec<String>,
}

/// Audit device types supported by Vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditDeviceType {
    /// Append audit entries to a file
    File,
    /// Send audit entries to syslog
    Syslog,
    /// Stream audit entries to a socket
    Socket,
}

impl AuditDeviceType {
    /// Identifier used by the Vault API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Syslog => "syslog",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for AuditDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secrets engines this client provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretsBackend {
    /// Versioned key/value store
    KvV2,
    /// X.509 certificate authority
    Pki,
    /// Encryption as a service
    Transit,
}

impl SecretsBackend {
    /// Identifier used by the Vault API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KvV2 => "kv-v2",
            Self::Pki => "pki",
            Self::Transit => "transit",
        }
    }
}

impl fmt::Display for SecretsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node state as reported by the health endpoint's status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Initialized, unsealed and active (200)
    Active,
    /// Unsealed standby (429)
    Standby,
    /// Disaster-recovery secondary (472)
    DrSecondary,
    /// Performance standby (473)
    PerformanceStandby,
    /// Not initialized (501)
    NotInitialized,
    /// Sealed (503)
    Sealed,
    /// Any other status code
    Other(u16),
}

impl HealthStatus {
    /// Interpret a health endpoint status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200 => Self::Active,
            429 => Self::Standby,
            472 => Self::DrSecondary,
            473 => Self::PerformanceStandby,
            501 => Self::NotInitialized,
            503 => Self::Sealed,
            other => Self::Other(other),
        }
    }

    /// The status code this state was read from.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Active => 200,
            Self::Standby => 429,
            Self::DrSecondary => 472,
            Self::PerformanceStandby => 473,
            Self::NotInitialized => 501,
            Self::Sealed => 503,
            Self::Other(code) => code,
        }
    }
}

/// Response of `sys/seal-status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SealStatus {
    /// Seal mechanism, e.g. `shamir` or `transit`
    #[serde(rename = "type")]
    pub seal_type: String,
    /// Whether the server has been initialized
    pub initialized: bool,
    /// Whether the server is sealed
    pub sealed: bool,
    /// Unseal threshold
    #[serde(default)]
    pub t: u32,
    /// Number of key shares
    #[serde(default)]
    pub n: u32,
    /// Unseal progress towards the threshold
    #[serde(default)]
    pub progress: u32,
    /// Whether a seal migration is in progress
    #[serde(default)]
    pub migration: bool,
    /// Whether recovery keys are in use
    #[serde(default)]
    pub recovery_seal: bool,
    /// Server version
    #[serde(default)]
    pub version: String,
    /// Cluster name, once unsealed
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Storage backend type
    #[serde(default)]
    pub storage_type: Option<String>,
}

/// Self-lookup data of the current token.
///
/// `Debug` output hides the token itself, which Vault returns as `id`.
#[derive(Clone, PartialEq, Deserialize)]
pub struct TokenData {
    /// Token accessor
    #[serde(default)]
    pub accessor: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Attached policies
    #[serde(default)]
    pub policies: Vec<String>,
    /// Remaining time to live, in seconds
    #[serde(default)]
    pub ttl: u64,
    /// Expiry, absent for root tokens
    #[serde(default)]
    pub expire_time: Option<DateTime<Utc>>,
    /// Whether the token can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// Token type, `service` or `batch`
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    /// Token metadata
    #[serde(default)]
    pub meta: Option<HashMap<String, String>>,
    /// Remaining fields, as returned by Vault
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra: HashMap<&str, &serde_json::Value> = self
            .extra
            .iter()
            .filter(|(key, _)| key.as_str() != TOKEN_ID_FIELD)
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        f.debug_struct("TokenData")
            .field("accessor", &self.accessor)
            .field("display_name", &self.display_name)
            .field("policies", &self.policies)
            .field("ttl", &self.ttl)
            .field("expire_time", &self.expire_time)
            .field("renewable", &self.renewable)
            .field("token_type", &self.token_type)
            .field("meta", &self.meta)
            .field("extra", &extra)
            .finish()
    }
}

/// Definition of a secret id bound to an `AppRole`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretIdInfo {
    /// Accessor of the secret id
    pub secret_id_accessor: String,
    /// CIDR blocks allowed to use the secret id
    #[serde(default)]
    pub cidr_list: Vec<String>,
    /// CIDR blocks bound to tokens issued with the secret id
    #[serde(default)]
    pub token_bound_cidrs: Vec<String>,
    /// Key/value metadata attached at issuance
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Remaining allowed uses, 0 for unlimited
    #[serde(default)]
    pub secret_id_num_uses: u64,
    /// Time to live, in seconds, 0 for unlimited
    #[serde(default)]
    pub secret_id_ttl: u64,
    /// Creation time
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    /// Expiration time
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Autopilot's view of the raft cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RaftClusterState {
    /// Whether every voter is healthy
    pub healthy: bool,
    /// Voters that can fail without losing quorum
    #[serde(default)]
    pub failure_tolerance: u32,
    /// Node id of the leader
    #[serde(default)]
    pub leader: String,
    /// Node ids of voting members
    #[serde(default)]
    pub voters: Vec<String>,
    /// Per-node state, keyed by node id
    #[serde(default)]
    pub servers: HashMap<String, AutopilotServer>,
}

/// Autopilot's view of a single raft node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutopilotServer {
    /// Node id
    pub id: String,
    /// Cluster address
    #[serde(default)]
    pub address: String,
    /// Whether the node is healthy
    #[serde(default)]
    pub healthy: bool,
    /// `leader`, `voter` or `non-voter`
    #[serde(default)]
    pub status: String,
    /// Membership status, e.g. `alive`
    #[serde(default)]
    pub node_status: String,
    /// Server version
    #[serde(default)]
    pub version: String,
}

/// A member of the raft configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RaftPeer {
    /// Node id
    pub node_id: String,
    /// Cluster address
    #[serde(default)]
    pub address: String,
    /// Whether the node is the leader
    #[serde(default)]
    pub leader: bool,
    /// Whether the node votes
    #[serde(default)]
    pub voter: bool,
}

/// Envelope used by most Vault responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse<T> {
    pub data: T,
}

/// Error body returned on non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub auth: AuthData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthData {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoleIdData {
    pub role_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretIdData {
    pub secret_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CsrData {
    pub csr: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignedCertificateData {
    pub certificate: String,
    pub issuing_ca: String,
    #[serde(default)]
    pub ca_chain: Vec<String>,
}

impl From<SignedCertificateData> for Certificate {
    fn from(data: SignedCertificateData) -> Self {
        Self {
            certificate: data.certificate,
            ca: data.issuing_ca,
            chain: data.ca_chain,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyList {
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PkiRoleData {
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitStatus {
    pub initialized: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaftConfigurationData {
    pub config: RaftConfiguration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RaftConfiguration {
    #[serde(default)]
    pub servers: Vec<RaftPeer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_identifiers() {
        assert_eq!(SecretsBackend::KvV2.as_str(), "kv-v2");
        assert_eq!(SecretsBackend::Pki.to_string(), "pki");
        assert_eq!(SecretsBackend::Transit.as_str(), "transit");
        assert_eq!(AuditDeviceType::File.as_str(), "file");
        assert_eq!(AuditDeviceType::Syslog.to_string(), "syslog");
        assert_eq!(AuditDeviceType::Socket.as_str(), "socket");
    }

    #[test]
    fn test_health_status_codes() {
        assert_eq!(HealthStatus::from_status(200), HealthStatus::Active);
        assert_eq!(HealthStatus::from_status(429), HealthStatus::Standby);
        assert_eq!(HealthStatus::from_status(503), HealthStatus::Sealed);
        assert_eq!(HealthStatus::from_status(418), HealthStatus::Other(418));
        for code in [200, 429, 472, 473, 501, 503, 418] {
            assert_eq!(HealthStatus::from_status(code).code(), code);
        }
    }

    #[test]
    fn test_seal_status_parses_vault_payload() {
        let status: SealStatus = serde_json::from_value(serde_json::json!({
            "type": "transit",
            "initialized": true,
            "sealed": false,
            "t": 1,
            "n": 1,
            "progress": 0,
            "nonce": "",
            "version": "1.15.4",
            "build_date": "2023-12-04T17:45:28Z",
            "migration": true,
            "cluster_name": "vault-cluster-1",
            "cluster_id": "0c0a...",
            "recovery_seal": true,
            "storage_type": "raft"
        }))
        .unwrap();
        assert_eq!(status.seal_type, "transit");
        assert!(status.migration);
        assert_eq!(status.storage_type.as_deref(), Some("raft"));
    }

    #[test]
    fn test_token_data_keeps_unknown_fields() {
        let data: TokenData = serde_json::from_value(serde_json::json!({
            "accessor": "8609694a-cdbc-db9b-d345-e782dbb562ed",
            "display_name": "approle",
            "policies": ["default", "charm-access"],
            "ttl": 2764,
            "expire_time": "2024-06-01T12:00:00.123456789Z",
            "renewable": true,
            "type": "service",
            "num_uses": 0
        }))
        .unwrap();
        assert_eq!(data.policies, vec!["default", "charm-access"]);
        assert_eq!(data.token_type.as_deref(), Some("service"));
        assert!(data.expire_time.is_some());
        assert_eq!(data.extra.get("num_uses"), Some(&serde_json::json!(0)));
    }

    #[test]
    fn test_token_data_debug_hides_token() {
        let data: TokenData = serde_json::from_value(serde_json::json!({
            "accessor": "8609694a-cdbc-db9b-d345-e782dbb562ed",
            "id": "hvs.CAESIJlU4d5nU2LWJ0Yk",
            "policies": ["root"],
            "num_uses": 0
        }))
        .unwrap();
        assert!(data.extra.contains_key("id"));

        let rendered = format!("{data:?}");
        assert!(!rendered.contains("hvs.CAESIJlU4d5nU2LWJ0Yk"));
        assert!(rendered.contains("8609694a-cdbc-db9b-d345-e782dbb562ed"));
        assert!(rendered.contains("num_uses"));
    }

    #[test]
    fn test_root_token_has_no_expiry() {
        let data: TokenData = serde_json::from_value(serde_json::json!({
            "accessor": "abc",
            "policies": ["root"],
            "ttl": 0,
            "expire_time": null
        }))
        .unwrap();
        assert!(data.expire_time.is_none());
    }

    #[test]
    fn test_signed_certificate_maps_to_certificate() {
        let data: SignedCertificateData = serde_json::from_value(serde_json::json!({
            "certificate": "CERT",
            "issuing_ca": "CA",
            "ca_chain": ["CA", "ROOT"],
            "serial_number": "39:dd"
        }))
        .unwrap();
        let cert = Certificate::from(data);
        assert_eq!(cert.ca, "CA");
        assert_eq!(cert.chain, vec!["CA", "ROOT"]);
    }
}
