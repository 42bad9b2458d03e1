//! Resolved contracts options, grouped per chain.

use crate::validation::{
	validate_hex_address, validate_positive, validate_rpc_url, validate_websocket_url,
	ValidationReport,
};
use crate::ConfigError;
use std::time::Duration;

/// Default tolerance before a chain connection is considered lost.
pub const DEFAULT_MAX_CHAIN_DISCONNECT_TIME: Duration = Duration::from_secs(300);
/// Default number of blocks fetched per `eth_getLogs` call during backfill.
pub const DEFAULT_BACKFILL_BLOCK_PAGE_SIZE: u64 = 500;
/// Default largest payload accepted by the app chain broadcasters.
pub const DEFAULT_MAX_BLOCKCHAIN_PAYLOAD_SIZE: u64 = 200_000;
/// Default interval between node registry refreshes.
pub const DEFAULT_NODE_REGISTRY_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
/// Default interval between rate registry refreshes.
pub const DEFAULT_RATE_REGISTRY_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Resolved configuration for one contracts deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractsOptions {
	pub app_chain: AppChainOptions,
	pub settlement_chain: SettlementChainOptions,
}

/// Contracts and polling settings for the app chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppChainOptions {
	pub rpc_url: String,
	pub wss_url: String,
	pub chain_id: u64,
	/// Block the contracts were deployed at, the lower bound for backfill.
	pub deployment_block: u64,
	pub group_message_broadcaster_address: String,
	pub identity_update_broadcaster_address: String,
	pub gateway_address: String,
	pub parameter_registry_address: String,
	pub max_chain_disconnect_time: Duration,
	pub backfill_block_page_size: u64,
	pub max_blockchain_payload_size: u64,
}

impl Default for AppChainOptions {
	fn default() -> Self {
		Self {
			rpc_url: String::new(),
			wss_url: String::new(),
			chain_id: 0,
			deployment_block: 0,
			group_message_broadcaster_address: String::new(),
			identity_update_broadcaster_address: String::new(),
			gateway_address: String::new(),
			parameter_registry_address: String::new(),
			max_chain_disconnect_time: DEFAULT_MAX_CHAIN_DISCONNECT_TIME,
			backfill_block_page_size: DEFAULT_BACKFILL_BLOCK_PAGE_SIZE,
			max_blockchain_payload_size: DEFAULT_MAX_BLOCKCHAIN_PAYLOAD_SIZE,
		}
	}
}

/// Contracts and polling settings for the settlement chain.
///
/// The settlement chain hosts the node registry, so administrative tooling
/// talks to this chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementChainOptions {
	pub rpc_url: String,
	pub wss_url: String,
	pub chain_id: u64,
	/// Block the contracts were deployed at, the lower bound for backfill.
	pub deployment_block: u64,
	pub node_registry_address: String,
	pub rate_registry_address: String,
	pub parameter_registry_address: String,
	pub payer_registry_address: String,
	pub payer_report_manager_address: String,
	pub gateway_address: String,
	pub distribution_manager_address: String,
	pub underlying_fee_token: String,
	pub fee_token: String,
	pub node_registry_refresh_interval: Duration,
	pub rate_registry_refresh_interval: Duration,
	pub max_chain_disconnect_time: Duration,
	pub backfill_block_page_size: u64,
}

impl Default for SettlementChainOptions {
	fn default() -> Self {
		Self {
			rpc_url: String::new(),
			wss_url: String::new(),
			chain_id: 0,
			deployment_block: 0,
			node_registry_address: String::new(),
			rate_registry_address: String::new(),
			parameter_registry_address: String::new(),
			payer_registry_address: String::new(),
			payer_report_manager_address: String::new(),
			gateway_address: String::new(),
			distribution_manager_address: String::new(),
			underlying_fee_token: String::new(),
			fee_token: String::new(),
			node_registry_refresh_interval: DEFAULT_NODE_REGISTRY_REFRESH_INTERVAL,
			rate_registry_refresh_interval: DEFAULT_RATE_REGISTRY_REFRESH_INTERVAL,
			max_chain_disconnect_time: DEFAULT_MAX_CHAIN_DISCONNECT_TIME,
			backfill_block_page_size: DEFAULT_BACKFILL_BLOCK_PAGE_SIZE,
		}
	}
}

impl ContractsOptions {
	/// RPC endpoint of the chain hosting the node registry.
	pub fn rpc_url(&self) -> &str {
		&self.settlement_chain.rpc_url
	}

	/// Chain ID of the chain hosting the node registry.
	pub fn chain_id(&self) -> u64 {
		self.settlement_chain.chain_id
	}

	pub fn with_settlement_rpc_url(mut self, url: impl Into<String>) -> Self {
		self.settlement_chain.rpc_url = url.into();
		self
	}

	pub fn with_app_chain_rpc_url(mut self, url: impl Into<String>) -> Self {
		self.app_chain.rpc_url = url.into();
		self
	}

	/// Checks the options needed to talk to both chains.
	///
	/// Every problem is collected before failing, so one run reports all of
	/// them: missing values first as `Missing required arguments: ...`,
	/// followed by the invalid ones.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let mut report = ValidationReport::default();

		let app = &self.app_chain;
		validate_positive(app.chain_id, "contracts.app-chain.chain-id", &mut report);
		if !app.rpc_url.is_empty() {
			validate_rpc_url(&app.rpc_url, "contracts.app-chain.rpc-url", &mut report);
		}
		if !app.wss_url.is_empty() {
			validate_websocket_url(&app.wss_url, "contracts.app-chain.wss-url", &mut report);
		}
		validate_hex_address(
			&app.group_message_broadcaster_address,
			"contracts.app-chain.group-message-broadcaster-address",
			&mut report,
		);
		validate_hex_address(
			&app.identity_update_broadcaster_address,
			"contracts.app-chain.identity-update-broadcaster-address",
			&mut report,
		);
		validate_positive(
			app.max_chain_disconnect_time.as_millis(),
			"contracts.app-chain.max-chain-disconnect-time",
			&mut report,
		);
		validate_positive(
			app.backfill_block_page_size,
			"contracts.app-chain.backfill-block-page-size",
			&mut report,
		);

		let settlement = &self.settlement_chain;
		validate_positive(
			settlement.chain_id,
			"contracts.settlement-chain.chain-id",
			&mut report,
		);
		validate_rpc_url(
			&settlement.rpc_url,
			"contracts.settlement-chain.rpc-url",
			&mut report,
		);
		if !settlement.wss_url.is_empty() {
			validate_websocket_url(
				&settlement.wss_url,
				"contracts.settlement-chain.wss-url",
				&mut report,
			);
		}
		validate_hex_address(
			&settlement.node_registry_address,
			"contracts.settlement-chain.node-registry-address",
			&mut report,
		);
		validate_positive(
			settlement.node_registry_refresh_interval.as_millis(),
			"contracts.settlement-chain.node-registry-refresh-interval",
			&mut report,
		);
		validate_positive(
			settlement.rate_registry_refresh_interval.as_millis(),
			"contracts.settlement-chain.rate-registry-refresh-interval",
			&mut report,
		);
		validate_positive(
			settlement.max_chain_disconnect_time.as_millis(),
			"contracts.settlement-chain.max-chain-disconnect-time",
			&mut report,
		);
		validate_positive(
			settlement.backfill_block_page_size,
			"contracts.settlement-chain.backfill-block-page-size",
			&mut report,
		);

		report.into_result()
	}
}
