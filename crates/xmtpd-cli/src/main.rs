//! Command line tooling for the xmtpd node registry.
//!
//! Contract addresses come from exactly one of `--environment`,
//! `--config-file-path` or `--config-json`. Commands that write to the
//! registry sign with `--admin-private-key` on the settlement chain.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod required;

use required::{MissingFlags, RequiredFlags};

/// Command-line arguments for the registry tooling.
#[derive(Parser, Debug)]
#[command(name = "xmtpd-cli", author, about, long_about = None, disable_version_flag = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Named contracts environment (anvil, mainnet, testnet, testnet-staging, testnet-dev)
	#[arg(long, global = true, env = "XMTPD_CONTRACTS_ENVIRONMENT")]
	environment: Option<String>,

	/// Contracts config as a path, file://, http(s):// or config://<env> URL
	#[arg(long, global = true, env = "XMTPD_CONTRACTS_CONFIG_FILE_PATH")]
	config_file_path: Option<String>,

	/// Contracts config as inline JSON
	#[arg(long, global = true, env = "XMTPD_CONTRACTS_CONFIG_JSON")]
	config_json: Option<String>,

	/// Settlement chain RPC URL
	#[arg(long, global = true, env = "SETTLEMENT_RPC_URL")]
	rpc_url: Option<String>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Generate a private key and print its public key and address
	GenerateKey,
	/// Print the public key and address of a private key
	GetPubKey(GetPubKeyArgs),
	/// Register a node in the node registry
	RegisterNode(RegisterNodeArgs),
	/// Set whether a node is active
	UpdateActive(UpdateActiveArgs),
	/// Toggle whether a node serves the API
	UpdateApiEnabled(NodeAdminArgs),
	/// Set whether a node takes part in replication
	UpdateReplicationEnabled(UpdateReplicationArgs),
	/// Mark a node healthy
	MarkHealthy(NodeAdminArgs),
	/// Mark a node unhealthy
	MarkUnhealthy(NodeAdminArgs),
	/// Change the HTTP address of a node
	UpdateAddress(UpdateAddressArgs),
	/// List every registered node
	GetAllNodes(GetAllNodesArgs),
	/// Show one registered node
	GetNode(GetNodeArgs),
}

#[derive(Args, Debug)]
struct GetPubKeyArgs {
	/// Private key to derive the public key from
	#[arg(long)]
	private_key: Option<String>,
}

#[derive(Args, Debug)]
struct RegisterNodeArgs {
	/// Private key of the registry admin
	#[arg(long)]
	admin_private_key: Option<String>,
	/// HTTP address to register for the node
	#[arg(long)]
	http_address: Option<String>,
	/// Address that will own the node NFT
	#[arg(long)]
	node_owner_address: Option<String>,
	/// Signing public key of the node, compressed or uncompressed hex
	#[arg(long)]
	node_signing_key_pub: Option<String>,
	/// Register even if the signing key is already registered
	#[arg(long)]
	force: bool,
}

#[derive(Args, Debug)]
struct NodeAdminArgs {
	/// Private key of the registry admin
	#[arg(long)]
	admin_private_key: Option<String>,
	/// Node ID to administer
	#[arg(long)]
	node_id: Option<u32>,
}

#[derive(Args, Debug)]
struct UpdateActiveArgs {
	#[command(flatten)]
	node: NodeAdminArgs,
	/// New value of the active flag
	#[arg(long, value_name = "BOOL")]
	active: Option<bool>,
}

#[derive(Args, Debug)]
struct UpdateReplicationArgs {
	#[command(flatten)]
	node: NodeAdminArgs,
	/// New value of the replication flag
	#[arg(long, value_name = "BOOL")]
	enabled: Option<bool>,
}

#[derive(Args, Debug)]
struct UpdateAddressArgs {
	#[command(flatten)]
	node: NodeAdminArgs,
	/// New HTTP address
	#[arg(long)]
	address: Option<String>,
}

#[derive(Args, Debug)]
struct GetAllNodesArgs {
	/// Also write the nodes as JSON to this file
	#[arg(long)]
	out_file: Option<String>,
}

#[derive(Args, Debug)]
struct GetNodeArgs {
	/// Node ID to show
	#[arg(long)]
	node_id: Option<u32>,
}

impl NodeAdminArgs {
	fn required(&self) -> RequiredFlags {
		RequiredFlags::default()
			.check("admin-private-key", &self.admin_private_key)
			.check("node-id", &self.node_id)
	}
}

impl Commands {
	/// Reports every required flag the subcommand is missing.
	fn validate(&self) -> Result<(), MissingFlags> {
		let required = match self {
			Commands::GenerateKey | Commands::GetAllNodes(_) => RequiredFlags::default(),
			Commands::GetPubKey(args) => {
				RequiredFlags::default().check("private-key", &args.private_key)
			},
			Commands::RegisterNode(args) => RequiredFlags::default()
				.check("admin-private-key", &args.admin_private_key)
				.check("http-address", &args.http_address)
				.check("node-owner-address", &args.node_owner_address)
				.check("node-signing-key-pub", &args.node_signing_key_pub),
			Commands::UpdateActive(args) => args.node.required().check("active", &args.active),
			Commands::UpdateApiEnabled(args)
			| Commands::MarkHealthy(args)
			| Commands::MarkUnhealthy(args) => args.required(),
			Commands::UpdateReplicationEnabled(args) => {
				args.node.required().check("enabled", &args.enabled)
			},
			Commands::UpdateAddress(args) => args.node.required().check("address", &args.address),
			Commands::GetNode(args) => RequiredFlags::default().check("node-id", &args.node_id),
		};
		required.finish()
	}
}

/// What the process was started to do.
#[derive(Debug)]
enum Startup {
	/// Print the version and exit.
	Version,
	Run(Cli),
}

/// Returns true when the arguments ask for the version.
fn wants_version<I, S>(args: I) -> bool
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	args.into_iter()
		.any(|arg| matches!(arg.as_ref(), "-v" | "--version"))
}

/// Parses the process arguments, program name included.
///
/// A version flag anywhere wins over parsing, so it works alongside any
/// subcommand even when required flags are missing.
fn startup(args: Vec<String>) -> Result<Startup, clap::Error> {
	if wants_version(args.iter().skip(1)) {
		return Ok(Startup::Version);
	}
	Cli::try_parse_from(args).map(Startup::Run)
}

fn version_line() -> String {
	format!("Version: {}", env!("CARGO_PKG_VERSION"))
}

#[tokio::main]
async fn main() {
	let cli = match startup(std::env::args().collect()) {
		Ok(Startup::Version) => {
			println!("{}", version_line());
			return;
		},
		Ok(Startup::Run(cli)) => cli,
		Err(err) => err.exit(),
	};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();

	if let Err(err) = cli.command.validate() {
		tracing::error!("could not parse options: {}", err);
		std::process::exit(1);
	}

	if let Err(err) = commands::run(&cli).await {
		tracing::error!("{:#}", err);
		std::process::exit(1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("xmtpd-cli").chain(args.iter().copied())).unwrap()
	}

	#[test]
	fn test_register_node_missing_all_flags() {
		let cli = parse(&["register-node"]);
		let err = cli.command.validate().unwrap_err();
		assert_eq!(
			err.to_string(),
			"the required flags `--admin-private-key', `--http-address', `--node-owner-address' and `--node-signing-key-pub' were not specified"
		);
	}

	#[test]
	fn test_register_node_missing_some_flags() {
		let cli = parse(&[
			"register-node",
			"--http-address",
			"https://node.example",
			"--admin-private-key",
			"0x01",
		]);
		let err = cli.command.validate().unwrap_err();
		assert_eq!(
			err.to_string(),
			"the required flags `--node-owner-address' and `--node-signing-key-pub' were not specified"
		);
	}

	#[test]
	fn test_single_missing_flag() {
		let cli = parse(&["get-node"]);
		assert_eq!(
			cli.command.validate().unwrap_err().to_string(),
			"the required flag `--node-id' was not specified"
		);

		let cli = parse(&["get-node", "--node-id", "100"]);
		assert!(cli.command.validate().is_ok());
	}

	#[test]
	fn test_flattened_node_flags() {
		let cli = parse(&["update-active", "--node-id", "100"]);
		assert_eq!(
			cli.command.validate().unwrap_err().to_string(),
			"the required flags `--active' and `--admin-private-key' were not specified"
		);

		let cli = parse(&[
			"update-replication-enabled",
			"--admin-private-key",
			"0x01",
			"--node-id",
			"100",
			"--enabled",
			"false",
		]);
		match &cli.command {
			Commands::UpdateReplicationEnabled(args) => {
				assert_eq!(args.enabled, Some(false));
				assert_eq!(args.node.node_id, Some(100));
			},
			other => panic!("unexpected command {:?}", other),
		}
		assert!(cli.command.validate().is_ok());
	}

	#[test]
	fn test_commands_without_required_flags() {
		assert!(parse(&["generate-key"]).command.validate().is_ok());
		assert!(parse(&["get-all-nodes"]).command.validate().is_ok());
	}

	#[test]
	fn test_global_flags_after_subcommand() {
		let cli = parse(&[
			"get-all-nodes",
			"--environment",
			"testnet",
			"--rpc-url",
			"http://localhost:8545",
			"--log-level",
			"debug",
		]);
		assert_eq!(cli.environment.as_deref(), Some("testnet"));
		assert_eq!(cli.rpc_url.as_deref(), Some("http://localhost:8545"));
		assert_eq!(cli.log_level, "debug");
	}

	#[test]
	fn test_invalid_flag_value_is_a_parse_error() {
		let args = ["xmtpd-cli", "get-node", "--node-id", "abc"];
		assert!(Cli::try_parse_from(args).is_err());
	}

	fn args(args: &[&str]) -> Vec<String> {
		std::iter::once("xmtpd-cli")
			.chain(args.iter().copied())
			.map(String::from)
			.collect()
	}

	#[test]
	fn test_version_skips_required_flag_checks() {
		let missing = args(&["register-node"]);
		match startup(missing).unwrap() {
			Startup::Run(cli) => assert!(cli.command.validate().is_err()),
			Startup::Version => panic!("no version flag was given"),
		}

		for flag in ["-v", "--version"] {
			let parsed = startup(args(&["register-node", flag])).unwrap();
			assert!(matches!(parsed, Startup::Version), "{}", flag);
		}
		assert!(matches!(startup(args(&["-v"])).unwrap(), Startup::Version));
		assert_eq!(version_line(), format!("Version: {}", env!("CARGO_PKG_VERSION")));
	}

	#[test]
	fn test_startup_reports_parse_errors() {
		assert!(startup(args(&["get-node", "--node-id", "abc"])).is_err());
		assert!(startup(args(&["no-such-command"])).is_err());
	}

	#[test]
	fn test_wants_version() {
		assert!(wants_version(["-v"]));
		assert!(wants_version(["register-node", "--version"]));
		assert!(!wants_version(["get-all-nodes", "--verbose"]));
		assert!(!wants_version(Vec::<String>::new()));
	}
}
