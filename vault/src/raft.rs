//! Raft snapshots and cluster membership.
//!
//! Membership is never cached: every query reads the peer list from the
//! server. Clusters are small, so a linear scan is all that is needed.

use crate::{
    client::{LOG_TARGET, Vault},
    error::VaultResult,
    models::{RaftClusterState, RaftConfigurationData, RaftPeer},
};
use reqwest::Method;
use tracing::{info, instrument};

/// Autopilot state endpoint, relative to `/v1/`.
pub const RAFT_STATE_ENDPOINT: &str = "sys/storage/raft/autopilot/state";

const RAFT_CONFIGURATION_ENDPOINT: &str = "sys/storage/raft/configuration";

impl Vault {
    /// Take a raft snapshot and return its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn create_snapshot(&self) -> VaultResult<Vec<u8>> {
        self.read_bytes("sys/storage/raft/snapshot").await
    }

    /// Restore a raft snapshot.
    ///
    /// Uses the forced restore, which accepts snapshots taken under different
    /// unseal keys than the cluster's current ones.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    pub async fn restore_snapshot(&self, snapshot: Vec<u8>) -> VaultResult<()> {
        let size = snapshot.len();
        self.write_bytes("sys/storage/raft/snapshot-force", snapshot)
            .await?;
        info!(target: LOG_TARGET, bytes = size, "Restored raft snapshot");
        Ok(())
    }

    /// Read autopilot's view of the cluster.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn get_raft_cluster_state(&self) -> VaultResult<RaftClusterState> {
        self.read_data(RAFT_STATE_ENDPOINT).await
    }

    /// Whether autopilot reports the cluster healthy.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn is_raft_cluster_healthy(&self) -> VaultResult<bool> {
        Ok(self.get_raft_cluster_state().await?.healthy)
    }

    /// Remove a peer from the raft configuration.
    ///
    /// # Errors
    ///
    /// Returns any rejection of the request.
    #[instrument(target = "vault_client", skip(self))]
    pub async fn remove_raft_node(&self, node_id: &str) -> VaultResult<()> {
        let body = serde_json::json!({ "server_id": node_id });
        self.write(Method::POST, "sys/storage/raft/remove-peer", Some(&body))
            .await?;
        info!(target: LOG_TARGET, "Removed raft node {node_id}");
        Ok(())
    }

    /// Current members of the raft configuration.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn raft_peers(&self) -> VaultResult<Vec<RaftPeer>> {
        let data: RaftConfigurationData = self.read_data(RAFT_CONFIGURATION_ENDPOINT).await?;
        Ok(data.config.servers)
    }

    /// Whether `node_id` is a member of the raft configuration.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn is_node_in_raft_peers(&self, node_id: &str) -> VaultResult<bool> {
        Ok(self
            .raft_peers()
            .await?
            .iter()
            .any(|peer| peer.node_id == node_id))
    }

    /// Number of members in the raft configuration.
    ///
    /// # Errors
    ///
    /// Returns any failure of the request.
    pub async fn get_num_raft_peers(&self) -> VaultResult<usize> {
        Ok(self.raft_peers().await?.len())
    }
}
