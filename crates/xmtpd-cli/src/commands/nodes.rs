use super::{print_json, Registry};
use crate::required::flag;
use crate::{
	Cli, GetAllNodesArgs, GetNodeArgs, NodeAdminArgs, RegisterNodeArgs, UpdateActiveArgs,
	UpdateAddressArgs, UpdateReplicationArgs,
};
use anyhow::Context;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::path::Path;
use tracing::{info, warn};
use xmtpd_types::{parse_address, parse_public_key, truncate_id, NodeRecord};

pub(super) async fn register_node(cli: &Cli, args: &RegisterNodeArgs) -> anyhow::Result<()> {
	let admin_key = flag(&args.admin_private_key, "admin-private-key")?;
	let http_address = flag(&args.http_address, "http-address")?;
	let owner = parse_address(flag(&args.node_owner_address, "node-owner-address")?)?;
	let signing_key_hex = flag(&args.node_signing_key_pub, "node-signing-key-pub")?;
	let signing_key = parse_public_key(signing_key_hex).context("could not decompress public key")?;

	let registry = Registry::load(cli).await?;
	if !args.force {
		let nodes = registry
			.caller()?
			.get_all_nodes()
			.await
			.context("could not retrieve nodes from registry")?;
		let uncompressed = signing_key.to_encoded_point(false);
		if let Some(node) = find_registered(&nodes, uncompressed.as_bytes()) {
			warn!(
				node_id = node.node_id,
				signing_key_pub = %truncate_id(signing_key_hex),
				"Signing key is already registered"
			);
			return Ok(());
		}
	}

	let node_id = registry
		.admin(admin_key)
		.await?
		.add_node(owner, &signing_key, http_address)
		.await
		.context("could not add node")?;
	info!(node_id, owner = %owner, http_address = %http_address, "Node registered");
	Ok(())
}

pub(super) async fn update_active(cli: &Cli, args: &UpdateActiveArgs) -> anyhow::Result<()> {
	let (admin_key, node_id) = node_flags(&args.node)?;
	let active = *flag(&args.active, "active")?;

	Registry::load(cli)
		.await?
		.admin(admin_key)
		.await?
		.update_active(node_id, active)
		.await?;
	info!(node_id, active, "Node active flag updated");
	Ok(())
}

pub(super) async fn update_api_enabled(cli: &Cli, args: &NodeAdminArgs) -> anyhow::Result<()> {
	let (admin_key, node_id) = node_flags(args)?;

	let enabled = Registry::load(cli)
		.await?
		.admin(admin_key)
		.await?
		.update_is_api_enabled(node_id)
		.await?;
	info!(node_id, api_enabled = enabled, "Node API flag toggled");
	Ok(())
}

pub(super) async fn update_replication_enabled(
	cli: &Cli,
	args: &UpdateReplicationArgs,
) -> anyhow::Result<()> {
	let (admin_key, node_id) = node_flags(&args.node)?;
	let enabled = *flag(&args.enabled, "enabled")?;

	Registry::load(cli)
		.await?
		.admin(admin_key)
		.await?
		.update_is_replication_enabled(node_id, enabled)
		.await?;
	info!(node_id, replication_enabled = enabled, "Node replication flag updated");
	Ok(())
}

/// Health is recorded through the active flag.
pub(super) async fn mark_health(cli: &Cli, args: &NodeAdminArgs, healthy: bool) -> anyhow::Result<()> {
	let (admin_key, node_id) = node_flags(args)?;

	Registry::load(cli)
		.await?
		.admin(admin_key)
		.await?
		.update_active(node_id, healthy)
		.await?;
	info!(node_id, healthy, "Node health updated");
	Ok(())
}

pub(super) async fn update_address(cli: &Cli, args: &UpdateAddressArgs) -> anyhow::Result<()> {
	let (admin_key, node_id) = node_flags(&args.node)?;
	let address = flag(&args.address, "address")?;

	Registry::load(cli)
		.await?
		.admin(admin_key)
		.await?
		.update_http_address(node_id, address)
		.await?;
	info!(node_id, http_address = %address, "Node HTTP address updated");
	Ok(())
}

pub(super) async fn get_all_nodes(cli: &Cli, args: &GetAllNodesArgs) -> anyhow::Result<()> {
	let nodes = Registry::load(cli)
		.await?
		.caller()?
		.get_all_nodes()
		.await
		.context("could not retrieve nodes from registry")?;
	info!(size = nodes.len(), "Got nodes");

	if let Some(out_file) = &args.out_file {
		write_nodes(Path::new(out_file), &nodes).await?;
		info!(out_file = %out_file, "Wrote nodes");
	}
	print_json(&nodes)
}

pub(super) async fn get_node(cli: &Cli, args: &GetNodeArgs) -> anyhow::Result<()> {
	let node_id = *flag(&args.node_id, "node-id")?;
	let node = Registry::load(cli)
		.await?
		.caller()?
		.get_node(node_id)
		.await
		.context("could not retrieve node from registry")?;
	print_json(&node)
}

fn node_flags(args: &NodeAdminArgs) -> anyhow::Result<(&str, u32)> {
	let admin_key = flag(&args.admin_private_key, "admin-private-key")?;
	let node_id = *flag(&args.node_id, "node-id")?;
	Ok((admin_key.as_str(), node_id))
}

fn find_registered<'a>(nodes: &'a [NodeRecord], uncompressed: &[u8]) -> Option<&'a NodeRecord> {
	nodes.iter().find(|node| node.has_signing_key(uncompressed))
}

async fn write_nodes(path: &Path, nodes: &[NodeRecord]) -> anyhow::Result<()> {
	let json = serde_json::to_vec_pretty(nodes)?;
	tokio::fs::write(path, json)
		.await
		.with_context(|| format!("could not write nodes to {}", path.display()))
}
