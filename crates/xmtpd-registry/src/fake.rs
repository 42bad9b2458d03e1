//! In-memory node registry answering the mock chain client.

use crate::bindings::NodeRegistry::{self, Node, NodeWithId};
use alloy_primitives::{Address, Bytes, Log, U256};
use alloy_sol_types::{SolCall, SolEvent};
use std::sync::{Arc, Mutex};
use xmtpd_chain::{ChainError, MockChainClient, MockOutcome};

pub(crate) const NODE_ID_INCREMENT: u64 = 100;
pub(crate) const NO_CHANGE: [u8; 4] = [0xa8, 0x8e, 0xe5, 0x77];

pub(crate) struct FakeRegistry {
	address: Address,
	nodes: Mutex<Vec<(Address, Node)>>,
}

impl FakeRegistry {
	pub fn new(address: Address) -> Arc<Self> {
		Arc::new(Self {
			address,
			nodes: Mutex::new(Vec::new()),
		})
	}

	/// A mock client for `chain_id` with `funded` holding one ether.
	pub fn client(self: &Arc<Self>, chain_id: u64, funded: Address) -> MockChainClient {
		let on_send = self.clone();
		let on_call = self.clone();
		MockChainClient::new(chain_id)
			.with_balance(funded, U256::from(10).pow(U256::from(18)))
			.on_send(move |request| on_send.handle_send(request.input.input()))
			.on_call(move |request| on_call.handle_call(request.input.input()))
	}

	pub fn node(&self, node_id: u32) -> Option<(Address, Node)> {
		let index = index_of(U256::from(node_id))?;
		self.nodes.lock().unwrap().get(index).cloned()
	}

	fn emit<E: SolEvent>(&self, event: E) -> MockOutcome {
		MockOutcome::Success(vec![Log {
			address: self.address,
			data: event.encode_log_data(),
		}])
	}

	fn handle_send(&self, input: Option<&Bytes>) -> Result<MockOutcome, ChainError> {
		let input = input.cloned().unwrap_or_default();
		let mut nodes = self.nodes.lock().unwrap();

		if let Some(call) = decode::<NodeRegistry::addNodeCall>(&input) {
			nodes.push((
				call.to,
				Node {
					signingKeyPub: call.signingKeyPub.clone(),
					httpAddress: call.httpAddress.clone(),
					isReplicationEnabled: false,
					isApiEnabled: false,
					isActive: false,
					minMonthlyFee: call.minMonthlyFee,
				},
			));
			let node_id = U256::from(nodes.len() as u64 * NODE_ID_INCREMENT);
			return Ok(self.emit(NodeRegistry::NodeAdded {
				nodeId: node_id,
				owner: call.to,
				signingKeyPub: call.signingKeyPub,
				httpAddress: call.httpAddress,
				minMonthlyFee: call.minMonthlyFee,
			}));
		}

		if let Some(call) = decode::<NodeRegistry::updateActiveCall>(&input) {
			let node = node_mut(&mut nodes, call.nodeId)?;
			if node.isActive == call.isActive {
				// Rejected during gas estimation, as a node would.
				return Err(ChainError::Network(format!(
					"server returned an error response: error code 3: execution reverted, data: \"0x{}\"",
					hex::encode(NO_CHANGE)
				)));
			}
			node.isActive = call.isActive;
			return Ok(self.emit(NodeRegistry::NodeActivateUpdated {
				nodeId: call.nodeId,
				isActive: call.isActive,
			}));
		}

		if let Some(call) = decode::<NodeRegistry::updateHttpAddressCall>(&input) {
			let node = node_mut(&mut nodes, call.nodeId)?;
			node.httpAddress = call.httpAddress.clone();
			return Ok(self.emit(NodeRegistry::HttpAddressUpdated {
				nodeId: call.nodeId,
				newHttpAddress: call.httpAddress,
			}));
		}

		if let Some(call) = decode::<NodeRegistry::updateIsApiEnabledCall>(&input) {
			let node = node_mut(&mut nodes, call.nodeId)?;
			node.isApiEnabled = !node.isApiEnabled;
			return Ok(self.emit(NodeRegistry::ApiEnabledUpdated {
				nodeId: call.nodeId,
				isApiEnabled: node.isApiEnabled,
			}));
		}

		if let Some(call) = decode::<NodeRegistry::updateIsReplicationEnabledCall>(&input) {
			let node = node_mut(&mut nodes, call.nodeId)?;
			if node.isReplicationEnabled == call.isReplicationEnabled {
				// Mined and reverted.
				return Ok(MockOutcome::Revert(Bytes::from(NO_CHANGE.to_vec())));
			}
			node.isReplicationEnabled = call.isReplicationEnabled;
			return Ok(self.emit(NodeRegistry::ReplicationEnabledUpdated {
				nodeId: call.nodeId,
				isReplicationEnabled: call.isReplicationEnabled,
			}));
		}

		Err(ChainError::Network("unknown function selector".to_string()))
	}

	fn handle_call(&self, input: Option<&Bytes>) -> Result<Bytes, ChainError> {
		let input = input.cloned().unwrap_or_default();
		let nodes = self.nodes.lock().unwrap();

		if decode::<NodeRegistry::getAllNodesCall>(&input).is_some() {
			let all: Vec<NodeWithId> = nodes
				.iter()
				.enumerate()
				.map(|(index, (_, node))| NodeWithId {
					nodeId: U256::from((index as u64 + 1) * NODE_ID_INCREMENT),
					node: node.clone(),
				})
				.collect();
			return Ok(NodeRegistry::getAllNodesCall::abi_encode_returns(&(all,)).into());
		}

		if let Some(call) = decode::<NodeRegistry::getNodeCall>(&input) {
			let (_, node) = lookup(&nodes, call.nodeId)?;
			return Ok(NodeRegistry::getNodeCall::abi_encode_returns(&(node.clone(),)).into());
		}

		if let Some(call) = decode::<NodeRegistry::ownerOfCall>(&input) {
			let (owner, _) = lookup(&nodes, call.tokenId)?;
			return Ok(NodeRegistry::ownerOfCall::abi_encode_returns(&(*owner,)).into());
		}

		Err(ChainError::Network("unknown function selector".to_string()))
	}
}

fn decode<C: SolCall>(input: &[u8]) -> Option<C> {
	if !input.starts_with(&C::SELECTOR) {
		return None;
	}
	C::abi_decode(input, true).ok()
}

fn index_of(node_id: U256) -> Option<usize> {
	let node_id = u64::try_from(node_id).ok()?;
	if node_id % NODE_ID_INCREMENT != 0 {
		return None;
	}
	usize::try_from(node_id / NODE_ID_INCREMENT).ok()?.checked_sub(1)
}

fn lookup(nodes: &[(Address, Node)], node_id: U256) -> Result<&(Address, Node), ChainError> {
	index_of(node_id)
		.and_then(|index| nodes.get(index))
		.ok_or_else(|| ChainError::Network(format!("execution reverted: node {} not found", node_id)))
}

fn node_mut(nodes: &mut [(Address, Node)], node_id: U256) -> Result<&mut Node, ChainError> {
	index_of(node_id)
		.and_then(|index| nodes.get_mut(index))
		.map(|(_, node)| node)
		.ok_or_else(|| ChainError::Network(format!("execution reverted: node {} not found", node_id)))
}
