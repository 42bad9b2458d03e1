//! State-changing node registry operations.

use crate::bindings::NodeRegistry;
use crate::{node_id_from, RegistryError};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolEvent};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use std::sync::Arc;
use tracing::{info, instrument};
use xmtpd_account::TransactionSigner;
use xmtpd_chain::{
	execute_transaction, BoundContract, ChainClient, ChainError, ExecutorOptions, ExpectedEvent,
};

/// Administrative client for the node registry.
///
/// All writes are signed by one account. Writes from the same account must
/// not run concurrently, since nonces are assigned by the provider when the
/// transaction is filled.
pub struct NodeRegistryAdmin {
	contract: BoundContract,
	signer: Arc<dyn TransactionSigner>,
	options: ExecutorOptions,
}

impl NodeRegistryAdmin {
	pub fn new(
		client: Arc<dyn ChainClient>,
		signer: Arc<dyn TransactionSigner>,
		address: Address,
	) -> Self {
		Self {
			contract: BoundContract::new(address, client),
			signer,
			options: ExecutorOptions::default(),
		}
	}

	pub fn with_options(mut self, options: ExecutorOptions) -> Self {
		self.options = options;
		self
	}

	pub fn address(&self) -> Address {
		self.contract.address()
	}

	/// Registers a node and returns the ID assigned by the registry.
	pub async fn add_node(
		&self,
		owner: Address,
		signing_key: &PublicKey,
		http_address: &str,
	) -> Result<u32, RegistryError> {
		self.add_node_with_min_monthly_fee(owner, signing_key, http_address, U256::ZERO)
			.await
	}

	/// Registers a node with a minimum monthly fee, in micro-dollars.
	///
	/// The node ID is read from the `NodeAdded` event, which must name
	/// `owner`.
	#[instrument(skip_all, fields(owner = %owner, http_address = %http_address))]
	pub async fn add_node_with_min_monthly_fee(
		&self,
		owner: Address,
		signing_key: &PublicKey,
		http_address: &str,
		min_monthly_fee: U256,
	) -> Result<u32, RegistryError> {
		let call = NodeRegistry::addNodeCall {
			to: owner,
			signingKeyPub: Bytes::from(signing_key.to_encoded_point(false).as_bytes().to_vec()),
			httpAddress: http_address.to_string(),
			minMonthlyFee: min_monthly_fee,
		};

		let event = self
			.execute::<_, NodeRegistry::NodeAdded>("addNode", owner.to_string(), call, |event| {
				if event.owner != owner {
					return Err(ChainError::Verification(format!(
						"NodeAdded owner {} does not match {}",
						event.owner, owner
					)));
				}
				Ok(())
			})
			.await?;

		let node_id = node_id_from(event.nodeId)?;
		info!(
			node_id,
			owner = %event.owner,
			http_address = %event.httpAddress,
			signing_key_pub = %hex::encode(&event.signingKeyPub),
			min_monthly_fee = %event.minMonthlyFee,
			"Node added to registry"
		);
		Ok(node_id)
	}

	/// Sets whether a node is active.
	#[instrument(skip(self))]
	pub async fn update_active(&self, node_id: u32, is_active: bool) -> Result<(), RegistryError> {
		let call = NodeRegistry::updateActiveCall {
			nodeId: U256::from(node_id),
			isActive: is_active,
		};

		let result = self
			.execute::<_, NodeRegistry::NodeActivateUpdated>(
				"updateActive",
				node_target(node_id),
				call,
				|event| {
					expect_node(event.nodeId, node_id)?;
					expect_value("isActive", event.isActive, is_active)
				},
			)
			.await;

		if allow_no_change(result, node_id)?.is_some() {
			info!(node_id, is_active, "Node active flag updated");
		}
		Ok(())
	}

	/// Changes the HTTP address of a node.
	#[instrument(skip(self))]
	pub async fn update_http_address(
		&self,
		node_id: u32,
		http_address: &str,
	) -> Result<(), RegistryError> {
		let call = NodeRegistry::updateHttpAddressCall {
			nodeId: U256::from(node_id),
			httpAddress: http_address.to_string(),
		};

		let result = self
			.execute::<_, NodeRegistry::HttpAddressUpdated>(
				"updateHttpAddress",
				node_target(node_id),
				call,
				|event| {
					expect_node(event.nodeId, node_id)?;
					expect_value("newHttpAddress", event.newHttpAddress.as_str(), http_address)
				},
			)
			.await;

		if allow_no_change(result, node_id)?.is_some() {
			info!(node_id, http_address, "Node HTTP address updated");
		}
		Ok(())
	}

	/// Flips the API flag of a node and returns its new value.
	#[instrument(skip(self))]
	pub async fn update_is_api_enabled(&self, node_id: u32) -> Result<bool, RegistryError> {
		let call = NodeRegistry::updateIsApiEnabledCall {
			nodeId: U256::from(node_id),
		};

		let event = self
			.execute::<_, NodeRegistry::ApiEnabledUpdated>(
				"updateIsApiEnabled",
				node_target(node_id),
				call,
				|event| expect_node(event.nodeId, node_id),
			)
			.await?;

		info!(node_id, is_api_enabled = event.isApiEnabled, "Node API flag updated");
		Ok(event.isApiEnabled)
	}

	/// Sets whether a node takes part in replication.
	#[instrument(skip(self))]
	pub async fn update_is_replication_enabled(
		&self,
		node_id: u32,
		is_replication_enabled: bool,
	) -> Result<(), RegistryError> {
		let call = NodeRegistry::updateIsReplicationEnabledCall {
			nodeId: U256::from(node_id),
			isReplicationEnabled: is_replication_enabled,
		};

		let result = self
			.execute::<_, NodeRegistry::ReplicationEnabledUpdated>(
				"updateIsReplicationEnabled",
				node_target(node_id),
				call,
				|event| {
					expect_node(event.nodeId, node_id)?;
					expect_value(
						"isReplicationEnabled",
						event.isReplicationEnabled,
						is_replication_enabled,
					)
				},
			)
			.await;

		if allow_no_change(result, node_id)?.is_some() {
			info!(node_id, is_replication_enabled, "Node replication flag updated");
		}
		Ok(())
	}

	async fn execute<C, E>(
		&self,
		operation: &'static str,
		target: String,
		call: C,
		verify: impl FnOnce(&E) -> Result<(), ChainError>,
	) -> Result<E, RegistryError>
	where
		C: SolCall,
		E: SolEvent,
	{
		let contract = &self.contract;
		execute_transaction(
			contract.client().as_ref(),
			self.signer.as_ref(),
			ExpectedEvent::of::<E>(contract.address()),
			&self.options,
			|opts| Ok(contract.transact(opts, &call)),
			|log| contract.decode_event::<E>(log),
			verify,
		)
		.await
		.map_err(|source| RegistryError::Chain {
			operation,
			target,
			source,
		})
	}
}

fn node_target(node_id: u32) -> String {
	format!("node {}", node_id)
}

/// Maps a `NoChange()` revert to `Ok(None)`.
fn allow_no_change<E>(
	result: Result<E, RegistryError>,
	node_id: u32,
) -> Result<Option<E>, RegistryError> {
	match result {
		Ok(event) => Ok(Some(event)),
		Err(e) if e.protocol_error().is_some_and(|p| p.is_no_change()) => {
			info!(node_id, "Registry already up to date, nothing changed");
			Ok(None)
		},
		Err(e) => Err(e),
	}
}

fn expect_node(event_node_id: U256, node_id: u32) -> Result<(), ChainError> {
	if event_node_id != U256::from(node_id) {
		return Err(ChainError::Verification(format!(
			"event for node {}, expected node {}",
			event_node_id, node_id
		)));
	}
	Ok(())
}

fn expect_value<V>(field: &str, actual: V, expected: V) -> Result<(), ChainError>
where
	V: PartialEq + std::fmt::Display,
{
	if actual != expected {
		return Err(ChainError::Verification(format!(
			"event {} is {}, expected {}",
			field, actual, expected
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake::FakeRegistry;
	use std::time::Duration;
	use xmtpd_account::LocalTransactionSigner;
	use xmtpd_chain::{MockChainClient, MockOutcome};
	use xmtpd_types::{parse_private_key, SecretString};

	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const NODE_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const CHAIN_ID: u64 = 31337;

	fn registry_address() -> Address {
		"0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap()
	}

	fn signer(chain_id: u64) -> Arc<LocalTransactionSigner> {
		Arc::new(
			LocalTransactionSigner::from_private_key(&SecretString::from(ANVIL_KEY), chain_id)
				.unwrap(),
		)
	}

	fn node_key() -> PublicKey {
		let node_signer = parse_private_key(NODE_KEY).unwrap();
		(*node_signer.credential().verifying_key()).into()
	}

	fn fast() -> ExecutorOptions {
		ExecutorOptions {
			timeout: Duration::from_secs(5),
			poll_interval: Duration::from_millis(1),
			..Default::default()
		}
	}

	fn admin_for(client: Arc<dyn ChainClient>, chain_id: u64) -> NodeRegistryAdmin {
		NodeRegistryAdmin::new(client, signer(chain_id), registry_address()).with_options(fast())
	}

	fn setup() -> (NodeRegistryAdmin, Arc<FakeRegistry>, Arc<MockChainClient>) {
		let registry = FakeRegistry::new(registry_address());
		let client = Arc::new(registry.client(CHAIN_ID, signer(CHAIN_ID).address()));
		(admin_for(client.clone(), CHAIN_ID), registry, client)
	}

	#[tokio::test]
	async fn test_add_node() {
		let (admin, registry, client) = setup();
		let owner = Address::repeat_byte(0x11);

		let node_id = admin
			.add_node(owner, &node_key(), "https://node.example")
			.await
			.unwrap();
		assert!(node_id > 0);

		let (registered_owner, node) = registry.node(node_id).unwrap();
		assert_eq!(registered_owner, owner);
		assert_eq!(node.httpAddress, "https://node.example");
		assert_eq!(node.signingKeyPub.len(), 65);
		assert_eq!(node.signingKeyPub[0], 0x04);

		let second = admin
			.add_node(Address::repeat_byte(0x22), &node_key(), "https://other.example")
			.await
			.unwrap();
		assert_ne!(second, node_id);

		let sent = client.sent_transactions();
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0].to, Some(registry_address().into()));
		assert_eq!(sent[0].chain_id, Some(CHAIN_ID));
	}

	#[tokio::test]
	async fn test_add_node_owner_mismatch() {
		let client = Arc::new(
			MockChainClient::new(CHAIN_ID)
				.with_balance(signer(CHAIN_ID).address(), U256::from(1))
				.on_send(|_| {
					let event = NodeRegistry::NodeAdded {
						nodeId: U256::from(100),
						owner: Address::repeat_byte(0x99),
						signingKeyPub: Bytes::new(),
						httpAddress: String::new(),
						minMonthlyFee: U256::ZERO,
					};
					Ok(MockOutcome::Success(vec![alloy_primitives::Log {
						address: registry_address(),
						data: event.encode_log_data(),
					}]))
				}),
		);
		let admin = admin_for(client, CHAIN_ID);

		let err = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap_err();
		assert!(matches!(
			err.chain_error(),
			Some(ChainError::Verification(message)) if message.contains("does not match")
		));
	}

	#[tokio::test]
	async fn test_add_node_requires_event() {
		let client = Arc::new(
			MockChainClient::new(CHAIN_ID)
				.with_balance(signer(CHAIN_ID).address(), U256::from(1)),
		);
		let admin = admin_for(client, CHAIN_ID);

		let err = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap_err();
		assert!(matches!(err.chain_error(), Some(ChainError::EventNotFound { .. })));
		assert!(err.to_string().starts_with("addNode failed for 0x1111"));
	}

	#[tokio::test]
	async fn test_chain_mismatch_fails_before_network() {
		let registry = FakeRegistry::new(registry_address());
		let client = Arc::new(registry.client(CHAIN_ID, signer(CHAIN_ID).address()));
		let admin = admin_for(client.clone(), 84532);

		let err = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap_err();
		assert!(matches!(
			err.chain_error(),
			Some(ChainError::ChainIdMismatch { .. })
		));
		assert_eq!(client.request_count(), 0);
	}

	#[tokio::test]
	async fn test_update_active_is_idempotent() {
		let (admin, registry, client) = setup();
		let node_id = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap();

		admin.update_active(node_id, true).await.unwrap();
		assert!(registry.node(node_id).unwrap().1.isActive);

		// Already active: the contract reports NoChange().
		admin.update_active(node_id, true).await.unwrap();
		assert_eq!(client.sent_transactions().len(), 2);

		admin.update_active(node_id, false).await.unwrap();
		assert!(!registry.node(node_id).unwrap().1.isActive);
	}

	#[tokio::test]
	async fn test_update_replication_no_change_revert() {
		let (admin, registry, _) = setup();
		let node_id = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap();

		admin.update_is_replication_enabled(node_id, false).await.unwrap();
		assert!(!registry.node(node_id).unwrap().1.isReplicationEnabled);

		admin.update_is_replication_enabled(node_id, true).await.unwrap();
		assert!(registry.node(node_id).unwrap().1.isReplicationEnabled);
	}

	#[tokio::test]
	async fn test_update_is_api_enabled_toggles() {
		let (admin, _, _) = setup();
		let node_id = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://node.example")
			.await
			.unwrap();

		assert!(admin.update_is_api_enabled(node_id).await.unwrap());
		assert!(!admin.update_is_api_enabled(node_id).await.unwrap());
	}

	#[tokio::test]
	async fn test_update_http_address() {
		let (admin, registry, _) = setup();
		let node_id = admin
			.add_node(Address::repeat_byte(0x11), &node_key(), "https://old.example")
			.await
			.unwrap();

		admin
			.update_http_address(node_id, "https://new.example")
			.await
			.unwrap();
		assert_eq!(registry.node(node_id).unwrap().1.httpAddress, "https://new.example");
	}

	#[tokio::test]
	async fn test_unknown_node() {
		let (admin, _, _) = setup();
		let err = admin.update_active(999, true).await.unwrap_err();
		assert_eq!(err.protocol_error(), None);
		assert!(err.to_string().starts_with("updateActive failed for node 999"));
	}
}
