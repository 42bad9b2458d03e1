//! Node registry snapshot types.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A node as recorded in the on-chain node registry.
///
/// This is a read-only snapshot taken at query time. It is never cached
/// between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
	/// Registry assigned node ID.
	pub node_id: u32,
	/// Owner of the node NFT.
	pub owner: Address,
	/// Public HTTP endpoint of the node.
	pub http_address: String,
	/// Uncompressed SEC1 signing public key.
	pub signing_key_pub: Bytes,
	pub is_active: bool,
	/// The registry has no separate health flag. A node is healthy while it
	/// is active.
	pub is_healthy: bool,
	pub is_api_enabled: bool,
	pub is_replication_enabled: bool,
	pub min_monthly_fee: U256,
}

impl NodeRecord {
	/// Returns true if the stored signing key equals `uncompressed`.
	pub fn has_signing_key(&self, uncompressed: &[u8]) -> bool {
		self.signing_key_pub.as_ref() == uncompressed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_serializes_camel_case() {
		let record = NodeRecord {
			node_id: 100,
			owner: Address::ZERO,
			http_address: "https://node.example".to_string(),
			signing_key_pub: Bytes::from(vec![4u8, 1, 2]),
			is_active: true,
			is_healthy: true,
			is_api_enabled: false,
			is_replication_enabled: true,
			min_monthly_fee: U256::ZERO,
		};

		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["nodeId"], 100);
		assert_eq!(json["httpAddress"], "https://node.example");
		assert_eq!(json["signingKeyPub"], "0x040102");
		assert_eq!(json["isReplicationEnabled"], true);
		assert!(record.has_signing_key(&[4, 1, 2]));
	}
}
