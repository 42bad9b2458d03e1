//! Read-only node registry queries.

use crate::bindings::NodeRegistry;
use crate::{node_id_from, RegistryError};
use alloy_primitives::{Address, U256};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use xmtpd_chain::{BoundContract, ChainClient};
use xmtpd_types::NodeRecord;

/// Owner lookups in flight at once while listing nodes.
pub const OWNER_LOOKUP_CONCURRENCY: usize = 8;

/// Reads node registry state. Needs no signer.
#[derive(Debug, Clone)]
pub struct NodeRegistryCaller {
	contract: BoundContract,
}

impl NodeRegistryCaller {
	pub fn new(client: Arc<dyn ChainClient>, address: Address) -> Self {
		Self {
			contract: BoundContract::new(address, client),
		}
	}

	/// Returns every registered node with its owner.
	pub async fn get_all_nodes(&self) -> Result<Vec<NodeRecord>, RegistryError> {
		let nodes = self
			.contract
			.call(&NodeRegistry::getAllNodesCall {})
			.await
			.map_err(|source| RegistryError::Chain {
				operation: "getAllNodes",
				target: self.contract.address().to_string(),
				source,
			})?
			.allNodesList;

		tracing::debug!(count = nodes.len(), "Fetched nodes from registry");
		futures::stream::iter(nodes)
			.map(|entry| async move {
				let node_id = node_id_from(entry.nodeId)?;
				let owner = self.owner_of(node_id).await?;
				Ok::<_, RegistryError>(node_record(node_id, owner, entry.node))
			})
			.buffered(OWNER_LOOKUP_CONCURRENCY)
			.try_collect()
			.await
	}

	pub async fn get_node(&self, node_id: u32) -> Result<NodeRecord, RegistryError> {
		let node = self
			.contract
			.call(&NodeRegistry::getNodeCall {
				nodeId: U256::from(node_id),
			})
			.await
			.map_err(|source| RegistryError::Chain {
				operation: "getNode",
				target: format!("node {}", node_id),
				source,
			})?
			.node;
		let owner = self.owner_of(node_id).await?;
		Ok(node_record(node_id, owner, node))
	}

	/// Owner of the NFT representing a node.
	pub async fn owner_of(&self, node_id: u32) -> Result<Address, RegistryError> {
		let returns = self
			.contract
			.call(&NodeRegistry::ownerOfCall {
				tokenId: U256::from(node_id),
			})
			.await
			.map_err(|source| RegistryError::Chain {
				operation: "ownerOf",
				target: format!("node {}", node_id),
				source,
			})?;
		Ok(returns.owner)
	}
}

fn node_record(node_id: u32, owner: Address, node: NodeRegistry::Node) -> NodeRecord {
	NodeRecord {
		node_id,
		owner,
		http_address: node.httpAddress,
		signing_key_pub: node.signingKeyPub,
		is_active: node.isActive,
		is_healthy: node.isActive,
		is_api_enabled: node.isApiEnabled,
		is_replication_enabled: node.isReplicationEnabled,
		min_monthly_fee: node.minMonthlyFee,
	}
}
