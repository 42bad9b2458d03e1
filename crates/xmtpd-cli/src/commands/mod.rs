//! Subcommand handlers.

use crate::{Cli, Commands};
use alloy_primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use xmtpd_account::LocalTransactionSigner;
use xmtpd_chain::AlloyChainClient;
use xmtpd_config::validation::{parse_contract_address, validate_rpc_url, ValidationReport};
use xmtpd_config::{load_contracts_config, ContractsOptions, ContractsSource};
use xmtpd_registry::{NodeRegistryAdmin, NodeRegistryCaller};
use xmtpd_types::SecretString;

mod keys;
mod nodes;

pub async fn run(cli: &Cli) -> anyhow::Result<()> {
	match &cli.command {
		Commands::GenerateKey => keys::generate_key(),
		Commands::GetPubKey(args) => keys::get_pub_key(args),
		Commands::RegisterNode(args) => nodes::register_node(cli, args).await,
		Commands::UpdateActive(args) => nodes::update_active(cli, args).await,
		Commands::UpdateApiEnabled(args) => nodes::update_api_enabled(cli, args).await,
		Commands::UpdateReplicationEnabled(args) => {
			nodes::update_replication_enabled(cli, args).await
		},
		Commands::MarkHealthy(args) => nodes::mark_health(cli, args, true).await,
		Commands::MarkUnhealthy(args) => nodes::mark_health(cli, args, false).await,
		Commands::UpdateAddress(args) => nodes::update_address(cli, args).await,
		Commands::GetAllNodes(args) => nodes::get_all_nodes(cli, args).await,
		Commands::GetNode(args) => nodes::get_node(cli, args).await,
	}
}

/// The node registry deployment selected by the global flags.
#[derive(Debug)]
struct Registry {
	options: ContractsOptions,
	address: Address,
}

impl Registry {
	async fn load(cli: &Cli) -> anyhow::Result<Self> {
		let source = ContractsSource::from_parts(
			cli.environment.as_deref(),
			cli.config_file_path.as_deref(),
			cli.config_json.as_deref(),
		)?;
		let mut options = load_contracts_config(&source).await?;
		if let Some(rpc_url) = &cli.rpc_url {
			options = options.with_settlement_rpc_url(rpc_url.as_str());
		}

		let mut report = ValidationReport::default();
		validate_rpc_url(options.rpc_url(), "rpc-url", &mut report);
		report.into_result()?;

		let address = parse_contract_address(
			&options.settlement_chain.node_registry_address,
			"node-registry-address",
		)?;
		tracing::debug!(
			node_registry = %address,
			chain_id = options.chain_id(),
			"Resolved contracts configuration"
		);
		Ok(Self { options, address })
	}

	fn caller(&self) -> anyhow::Result<NodeRegistryCaller> {
		let client = AlloyChainClient::read_only(self.options.rpc_url(), self.options.chain_id())?;
		Ok(NodeRegistryCaller::new(Arc::new(client), self.address))
	}

	async fn admin(&self, private_key: &str) -> anyhow::Result<NodeRegistryAdmin> {
		let chain_id = self.options.chain_id();
		let signer = Arc::new(LocalTransactionSigner::from_private_key(
			&SecretString::from(private_key),
			chain_id,
		)?);
		let client =
			AlloyChainClient::connect_checked(self.options.rpc_url(), chain_id, signer.as_ref())
				.await?;
		Ok(NodeRegistryAdmin::new(Arc::new(client), signer, self.address))
	}
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
	let json = serde_json::to_string_pretty(value)?;
	println!("{}", json);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use xmtpd_config::Environment;

	fn cli(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("xmtpd-cli").chain(args.iter().copied())).unwrap()
	}

	async fn anvil_registry() -> Address {
		let options = load_contracts_config(&ContractsSource::Environment(Environment::Anvil))
			.await
			.unwrap();
		options.settlement_chain.node_registry_address.parse().unwrap()
	}

	#[tokio::test]
	async fn test_load_applies_rpc_url_override() {
		let registry = Registry::load(&cli(&[
			"get-all-nodes",
			"--environment",
			"anvil",
			"--rpc-url",
			"http://localhost:9545",
		]))
		.await
		.unwrap();

		assert_eq!(registry.options.rpc_url(), "http://localhost:9545");
		assert_eq!(registry.address, anvil_registry().await);
		assert!(registry.caller().is_ok());
	}

	#[tokio::test]
	async fn test_load_requires_rpc_url() {
		let err = Registry::load(&cli(&["get-all-nodes", "--environment", "anvil"]))
			.await
			.unwrap_err();
		assert!(
			err.to_string().contains("Missing required arguments: --rpc-url"),
			"{}",
			err
		);
	}

	#[tokio::test]
	async fn test_load_rejects_non_http_rpc_url() {
		let err = Registry::load(&cli(&[
			"get-all-nodes",
			"--environment",
			"anvil",
			"--rpc-url",
			"ws://localhost:8546",
		]))
		.await
		.unwrap_err();
		assert!(
			err.to_string().contains("--rpc-url is invalid, expected http or https, got ws"),
			"{}",
			err
		);
	}

	#[tokio::test]
	async fn test_load_rejects_bad_sources() {
		let err = Registry::load(&cli(&[
			"get-all-nodes",
			"--environment",
			"anvil",
			"--config-json",
			"{}",
		]))
		.await
		.unwrap_err();
		assert!(err.to_string().contains("mutually exclusive"), "{}", err);

		let err = Registry::load(&cli(&[
			"get-all-nodes",
			"--config-json",
			r#"{"nodeRegistry":"0x1234","settlementChainId":31337}"#,
			"--rpc-url",
			"http://localhost:8545",
		]))
		.await
		.unwrap_err();
		assert!(err.to_string().contains("--node-registry-address is invalid"), "{}", err);
	}
}
