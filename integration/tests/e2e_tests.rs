//! End-to-end operator workflows against the fake Vault server.
//!
//! Each test drives the client through a complete sequence an operator runs
//! in production: bootstrap, PKI issuance, auto-unseal handout and teardown,
//! and raft membership changes.

use proptest::prelude::*;
use secrecy::ExposeSecret;
use test_utils::fixtures::{
    AUTOUNSEAL_POLICY_TEMPLATE, INTERMEDIATE_CA_PEM, LEAF_CERTIFICATE_PEM, LEAF_CSR_PEM,
    write_policy_file,
};
use test_utils::{FakeVault, cidr_list_strategy, init_test_tracing, node_id_strategy};
use vault_ops_client::{
    AppRoleOptions, AuditDeviceType, AuthMethod, SecretsBackend, Vault, VaultConfig,
    autounseal_approle_name, autounseal_policy_name,
};
use wiremock::MockServer;

const PKI_MOUNT: &str = "charm-pki";
const TRANSIT_MOUNT: &str = "charm-autounseal";

async fn operator(fake: &FakeVault, server: &MockServer) -> Vault {
    init_test_tracing();
    let mut vault = Vault::new(VaultConfig::new(server.uri(), None)).unwrap();
    let root = AuthMethod::token(fake.root_token());
    assert!(vault.authenticate(&root).await.unwrap());
    vault
}

async fn bootstrap(vault: &Vault) {
    vault
        .enable_audit_device(AuditDeviceType::File, "stdout")
        .await
        .unwrap();
    vault.enable_approle_auth_method().await.unwrap();
    vault
        .enable_secrets_engine(SecretsBackend::Pki, PKI_MOUNT)
        .await
        .unwrap();
    vault
        .enable_secrets_engine(SecretsBackend::Transit, TRANSIT_MOUNT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let fake = FakeVault::new();
    let server = fake.start().await;
    let vault = operator(&fake, &server).await;

    bootstrap(&vault).await;
    bootstrap(&vault).await;

    assert_eq!(fake.mount_creations(), 2);
    assert_eq!(fake.audit_device_count(), 1);
    assert!(vault.is_secret_engine_enabled(PKI_MOUNT).await.unwrap());
    assert!(vault.is_secret_engine_enabled(TRANSIT_MOUNT).await.unwrap());
}

#[tokio::test]
async fn test_pki_issuance_workflow() {
    let fake = FakeVault::new();
    let server = fake.start().await;
    let vault = operator(&fake, &server).await;
    bootstrap(&vault).await;

    let csr = vault
        .generate_pki_intermediate_ca_csr(PKI_MOUNT, "vault.example.internal")
        .await
        .unwrap();
    assert!(csr.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));

    // The signed certificate comes back from an external CA.
    let installed = vault
        .is_intermediate_ca_set(PKI_MOUNT, INTERMEDIATE_CA_PEM)
        .await
        .unwrap();
    if !installed {
        vault
            .set_pki_intermediate_ca_certificate(INTERMEDIATE_CA_PEM, PKI_MOUNT)
            .await
            .unwrap();
    }
    vault
        .make_latest_pki_issuer_default(PKI_MOUNT)
        .await
        .unwrap();
    assert_eq!(vault.get_intermediate_ca(PKI_MOUNT).await.unwrap(), INTERMEDIATE_CA_PEM);

    if !vault.is_pki_role_created("apps", PKI_MOUNT).await.unwrap() {
        vault
            .create_or_update_pki_role("apps", "example.internal", PKI_MOUNT)
            .await
            .unwrap();
    }

    let certificate = vault
        .sign_pki_certificate_signing_request(
            PKI_MOUNT,
            "apps",
            LEAF_CSR_PEM,
            "db.example.internal",
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(certificate.certificate, LEAF_CERTIFICATE_PEM);
    assert_eq!(certificate.ca, INTERMEDIATE_CA_PEM);

    let refused = vault
        .sign_pki_certificate_signing_request(PKI_MOUNT, "apps", LEAF_CSR_PEM, "db.example.org")
        .await
        .unwrap();
    assert!(refused.is_none());
}

#[tokio::test]
async fn test_autounseal_handout_and_teardown() {
    let fake = FakeVault::new();
    let server = fake.start().await;
    let vault = operator(&fake, &server).await;
    bootstrap(&vault).await;
    let policy_path = write_policy_file(AUTOUNSEAL_POLICY_TEMPLATE).unwrap();

    let first = vault
        .create_autounseal_credentials(1, TRANSIT_MOUNT, &policy_path)
        .await
        .unwrap();
    let second = vault
        .create_autounseal_credentials(2, TRANSIT_MOUNT, &policy_path)
        .await
        .unwrap();
    assert_ne!(first.role_id, second.role_id);

    let mut remote = Vault::new(VaultConfig::new(server.uri(), None)).unwrap();
    let login = AuthMethod::approle(first.role_id.clone(), first.secret_id.expose_secret());
    assert!(remote.authenticate(&login).await.unwrap());
    let token = remote.get_token_data().await.unwrap().unwrap();
    assert_eq!(token.policies, vec![autounseal_policy_name(1)]);

    vault
        .destroy_autounseal_credentials(1, TRANSIT_MOUNT)
        .await
        .unwrap();
    assert!(!fake.approle_exists(&autounseal_approle_name(1)));
    assert!(fake.approle_exists(&autounseal_approle_name(2)));
    assert_eq!(fake.transit_keys(TRANSIT_MOUNT), vec!["1", "2"]);
    assert_eq!(fake.transit_key_deletions(), 0);

    let mut again = Vault::new(VaultConfig::new(server.uri(), None)).unwrap();
    assert!(!again.authenticate(&login).await.unwrap());
    std::fs::remove_file(policy_path).unwrap();
}

#[tokio::test]
async fn test_raft_member_replacement() {
    let fake = FakeVault::new();
    fake.add_raft_peer("vault-1");
    fake.add_raft_peer("vault-2");
    let server = fake.start().await;
    let vault = operator(&fake, &server).await;

    let snapshot = vault.create_snapshot().await.unwrap();
    vault.remove_raft_node("vault-2").await.unwrap();
    fake.add_raft_peer("vault-3");

    assert!(!vault.is_node_in_raft_peers("vault-2").await.unwrap());
    assert!(vault.is_node_in_raft_peers("vault-3").await.unwrap());
    assert_eq!(vault.get_num_raft_peers().await.unwrap(), 3);
    assert!(vault.is_raft_cluster_healthy().await.unwrap());

    vault.restore_snapshot(snapshot.clone()).await.unwrap();
    assert_eq!(fake.snapshot(), snapshot);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_secret_id_lookup_returns_bound_cidrs(cidrs in cidr_list_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let found = runtime.block_on(async {
            let fake = FakeVault::new();
            let server = fake.start().await;
            let vault = operator(&fake, &server).await;
            vault.enable_approle_auth_method().await.unwrap();
            let options = AppRoleOptions::default().with_policies(["workload"]);
            vault.configure_approle("workload", &options).await.unwrap();
            let secret_id = vault
                .generate_role_secret_id("workload", &cidrs)
                .await
                .unwrap();
            vault
                .read_role_secret("workload", secret_id.expose_secret())
                .await
                .unwrap()
                .cidr_list
        });
        prop_assert_eq!(found, cidrs);
    }

    #[test]
    fn prop_removed_node_leaves_membership(node_id in node_id_strategy()) {
        prop_assume!(node_id != "vault-0");
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (before, after) = runtime.block_on(async {
            let fake = FakeVault::new();
            fake.add_raft_peer(&node_id);
            let server = fake.start().await;
            let vault = operator(&fake, &server).await;
            let before = vault.is_node_in_raft_peers(&node_id).await.unwrap();
            vault.remove_raft_node(&node_id).await.unwrap();
            (before, vault.is_node_in_raft_peers(&node_id).await.unwrap())
        });
        prop_assert!(before);
        prop_assert!(!after);
    }
}
