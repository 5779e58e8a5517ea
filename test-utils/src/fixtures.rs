//! Test fixtures with sample data.
//!
//! PEM blocks here are well-formed envelopes around placeholder payloads;
//! nothing in the workspace parses certificates, it only moves them around.

use std::io;
use std::path::PathBuf;

/// Intermediate CA certificate as handed back by an external signer.
pub const INTERMEDIATE_CA_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBszCCAVmgAwIBAgIUQ2hhcm1lZC1pbnRlcm1lZGlhdGUtY2EwCgYIKoZIzj0E
AwIwGjEYMBYGA1UEAwwPdmF1bHQtcm9vdC1jYS0xMB4XDTI2MDEwMTAwMDAwMFoX
DTI3MDEwMTAwMDAwMFowHjEcMBoGA1UEAwwTdmF1bHQtaW50ZXJtZWRpYXRlMB
-----END CERTIFICATE-----
";

/// CSR returned by the fake for intermediate CA generation.
pub const INTERMEDIATE_CSR_PEM: &str = "-----BEGIN CERTIFICATE REQUEST-----
MIHYMIGAAgEAMB4xHDAaBgNVBAMME3ZhdWx0LWludGVybWVkaWF0ZTBZMBMGByqG
SM49AgEGCCqGSM49AwEHA0IABHZhdWx0LW9wcy1jbGllbnQtdGVzdC1jc3ItcGF5
bG9hZKAAMAoGCCqGSM49BAMCA0cAMEQCIHZhdWx0LW9wcy1jbGllbnQtdGVzdA==
-----END CERTIFICATE REQUEST-----
";

/// End-entity CSR submitted for signing.
pub const LEAF_CSR_PEM: &str = "-----BEGIN CERTIFICATE REQUEST-----
MIHWMH4CAQAwHDEaMBgGA1UEAwwRYXBwLmV4YW1wbGUuaW50ZXJuYWwwWTATBgcq
hkjOPQIBBggqhkjOPQMBBwNCAAR2YXVsdC1vcHMtY2xpZW50LWxlYWYtY3NyLXBh
-----END CERTIFICATE REQUEST-----
";

/// Certificate the fake returns for every signed CSR.
pub const LEAF_CERTIFICATE_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIBnDCCAUKgAwIBAgIUdmF1bHQtb3BzLWxlYWYtY2VydDAKBggqhkjOPQQDAjAe
MRwwGgYDVQQDDBN2YXVsdC1pbnRlcm1lZGlhdGUwHhcNMjYwMTAxMDAwMDAwWhcN
-----END CERTIFICATE-----
";

/// Transit auto-unseal policy template, rendered with `mount` and `key_name`.
pub const AUTOUNSEAL_POLICY_TEMPLATE: &str = r#"path "{mount}/encrypt/{key_name}" {{
  capabilities = ["update"]
}}

path "{mount}/decrypt/{key_name}" {{
  capabilities = ["update"]
}}
"#;

/// A static policy with no placeholders.
pub const STATIC_POLICY: &str = r#"path "charm-pki/*" {
  capabilities = ["read", "list"]
}
"#;

/// Bytes the fake serves as a raft snapshot until one is restored.
pub const SNAPSHOT_BYTES: &[u8] = b"\x1f\x8b\x08\x00vault-raft-snapshot\x00\xff\x00";

/// Write `contents` to a uniquely named file in the temp directory.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_policy_file(contents: &str) -> io::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("vault-ops-policy-{}.hcl", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// `sys/health` body for an initialized, unsealed node.
#[must_use]
pub fn health_body(standby: bool) -> serde_json::Value {
    serde_json::json!({
        "initialized": true,
        "sealed": false,
        "standby": standby,
        "performance_standby": false,
        "replication_performance_mode": "disabled",
        "replication_dr_mode": "disabled",
        "server_time_utc": 1_767_225_600,
        "version": "1.17.2",
        "cluster_name": "vault-cluster-test",
    })
}

/// `sys/seal-status` body.
#[must_use]
pub fn seal_status_body(seal_type: &str, sealed: bool, migration: bool) -> serde_json::Value {
    serde_json::json!({
        "type": seal_type,
        "initialized": true,
        "sealed": sealed,
        "t": 1,
        "n": 1,
        "progress": 0,
        "nonce": "",
        "version": "1.17.2",
        "build_date": "2026-01-01T00:00:00Z",
        "migration": migration,
        "recovery_seal": seal_type != "shamir",
        "storage_type": "raft",
    })
}

/// Vault error envelope.
#[must_use]
pub fn errors_body(errors: &[&str]) -> serde_json::Value {
    serde_json::json!({ "errors": errors })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_file_round_trips_contents() {
        let path = write_policy_file(STATIC_POLICY).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STATIC_POLICY);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_policy_files_do_not_collide() {
        let first = write_policy_file("a").unwrap();
        let second = write_policy_file("b").unwrap();
        assert_ne!(first, second);
        std::fs::remove_file(first).unwrap();
        std::fs::remove_file(second).unwrap();
    }

    #[test]
    fn test_seal_status_body_marks_recovery_seal() {
        assert_eq!(seal_status_body("transit", false, false)["recovery_seal"], true);
        assert_eq!(seal_status_body("shamir", true, false)["recovery_seal"], false);
    }
}
