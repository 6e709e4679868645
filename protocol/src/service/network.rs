//! `/network/list`, `/network/options` and `/network/status`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{MIDDLEWARE_VERSION, ROSETTA_VERSION};
use crate::rosetta::{
    Allow, BlockIdentifier, NetworkIdentifier, NetworkListResponse, NetworkOptionsResponse, NetworkRequest,
    NetworkStatusResponse, OperationStatus, OperationStatusInfo, OperationType, RosettaError, RosettaErrorKind,
    SyncStatus, Version,
};

use super::RosettaService;

impl RosettaService {
    pub fn network_identifier(&self) -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: self.config.blockchain().to_string(),
            network: self.config.network.as_str().to_string(),
            sub_network_identifier: None,
        }
    }

    /// The single network this deployment serves.
    pub fn network_list(&self) -> NetworkListResponse {
        NetworkListResponse {
            network_identifiers: vec![self.network_identifier()],
        }
    }

    pub async fn network_options(&self, req: NetworkRequest) -> Result<NetworkOptionsResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let node = self.call(self.rpc.get_node_info()).await?;
        Ok(NetworkOptionsResponse {
            version: Version {
                rosetta_version: ROSETTA_VERSION.to_string(),
                node_version: node.server_version,
                middleware_version: Some(MIDDLEWARE_VERSION.to_string()),
            },
            allow: Allow {
                operation_statuses: OperationStatus::ALL
                    .iter()
                    .map(|status| OperationStatusInfo {
                        status: status.as_str().to_string(),
                        successful: status.is_successful(),
                    })
                    .collect(),
                operation_types: OperationType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
                errors: RosettaErrorKind::ALL.iter().map(|kind| kind.body()).collect(),
                historical_balance_lookup: false,
                call_methods: Vec::new(),
                mempool_coins: false,
            },
        })
    }

    pub async fn network_status(&self, req: NetworkRequest) -> Result<NetworkStatusResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let node = self.call(self.rpc.get_node_info()).await?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Ok(NetworkStatusResponse {
            current_block_identifier: BlockIdentifier {
                index: node.stacks_tip_height,
                hash: node.stacks_tip,
            },
            current_block_timestamp: timestamp,
            genesis_block_identifier: BlockIdentifier {
                index: 0,
                hash: node.genesis_chainstate_hash,
            },
            peers: Vec::new(),
            sync_status: Some(SyncStatus {
                current_index: node.stacks_tip_height,
                target_index: None,
                synced: true,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn request() -> NetworkRequest {
        NetworkRequest {
            network_identifier: testnet(),
            metadata: None,
        }
    }

    #[test]
    fn lists_the_configured_network() {
        let list = service().network_list();
        assert_eq!(list.network_identifiers, vec![testnet()]);
    }

    #[tokio::test]
    async fn options_publish_every_table() {
        let options = service().network_options(request()).await.unwrap();
        assert_eq!(options.version.rosetta_version, ROSETTA_VERSION);
        assert_eq!(options.version.node_version, "stacks-node 2.5.0");
        assert_eq!(options.allow.operation_types.len(), OperationType::ALL.len());
        assert_eq!(options.allow.errors.len(), 45);
        assert!(options
            .allow
            .operation_statuses
            .iter()
            .any(|s| s.status == "success" && s.successful));
        assert!(!options.allow.historical_balance_lookup);
    }

    #[tokio::test]
    async fn status_reports_the_tip() {
        let status = service().network_status(request()).await.unwrap();
        assert_eq!(status.current_block_identifier.index, 150_000);
        assert_eq!(status.current_block_identifier.hash, BLOCK_HASH);
        assert!(status.current_block_timestamp > 0);
        assert_eq!(status.sync_status.unwrap().current_index, 150_000);
    }

    #[tokio::test]
    async fn wrong_network_is_rejected() {
        let mut req = request();
        req.network_identifier.network = "mainnet".into();
        let err = service().network_status(req).await.unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::InvalidNetwork);
    }
}
