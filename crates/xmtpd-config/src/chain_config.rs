//! Flat deployment manifest schema.

use crate::options::{AppChainOptions, ContractsOptions, SettlementChainOptions};
use serde::{Deserialize, Serialize};

/// The one-level JSON manifest published for every contracts deployment.
///
/// Missing keys decode to empty strings and zero, which validation reports
/// later. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
	pub app_chain_deployment_block: u64,
	pub app_chain_id: u64,
	pub app_chain_gateway: String,
	pub app_chain_parameter_registry: String,
	pub group_message_broadcaster: String,
	pub identity_update_broadcaster: String,
	pub settlement_chain_deployment_block: u64,
	pub settlement_chain_id: u64,
	pub settlement_chain_gateway: String,
	pub settlement_chain_parameter_registry: String,
	pub node_registry: String,
	pub rate_registry: String,
	pub payer_registry: String,
	pub payer_report_manager: String,
	pub distribution_manager: String,
	pub underlying_fee_token: String,
	pub fee_token: String,
}

impl ChainConfig {
	/// Parses a manifest from raw bytes.
	pub fn from_slice(data: &[u8]) -> Result<Self, crate::ConfigError> {
		Ok(serde_json::from_slice(data)?)
	}

	/// Groups the manifest per chain and fills in the polling defaults.
	///
	/// RPC endpoints are not part of a manifest and stay empty until the
	/// caller supplies them.
	pub fn into_options(self) -> ContractsOptions {
		ContractsOptions {
			app_chain: AppChainOptions {
				chain_id: self.app_chain_id,
				deployment_block: self.app_chain_deployment_block,
				group_message_broadcaster_address: self.group_message_broadcaster,
				identity_update_broadcaster_address: self.identity_update_broadcaster,
				gateway_address: self.app_chain_gateway,
				parameter_registry_address: self.app_chain_parameter_registry,
				..AppChainOptions::default()
			},
			settlement_chain: SettlementChainOptions {
				chain_id: self.settlement_chain_id,
				deployment_block: self.settlement_chain_deployment_block,
				node_registry_address: self.node_registry,
				rate_registry_address: self.rate_registry,
				parameter_registry_address: self.settlement_chain_parameter_registry,
				payer_registry_address: self.payer_registry,
				payer_report_manager_address: self.payer_report_manager,
				gateway_address: self.settlement_chain_gateway,
				distribution_manager_address: self.distribution_manager,
				underlying_fee_token: self.underlying_fee_token,
				fee_token: self.fee_token,
				..SettlementChainOptions::default()
			},
		}
	}
}
