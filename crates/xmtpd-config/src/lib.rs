//! Contracts configuration for the xmtpd registry tooling.
//!
//! Deployment manifests describe where the network's contracts live on the
//! app chain and the settlement chain. A manifest can come from exactly one
//! of three sources:
//! - a named environment embedded in the binary (`anvil`, `testnet`, ...)
//! - a path: local file, `file://` URI, `http(s)://` URL or `config://<env>`
//! - inline JSON text
//!
//! The flat manifest is mapped into [`ContractsOptions`], which groups the
//! addresses per chain and attaches the polling defaults that manifests do
//! not carry.

mod chain_config;
mod environments;
mod loader;
mod options;
pub mod validation;

pub use chain_config::ChainConfig;
pub use environments::Environment;
pub use loader::{load_contracts_config, ContractsSource, HTTP_TIMEOUT, MAX_CONFIG_SIZE};
pub use options::{AppChainOptions, ContractsOptions, SettlementChainOptions};

use thiserror::Error;

/// Errors that can occur while resolving contracts configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs when reading a local configuration file.
	#[error("read {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},
	/// Error that occurs when the manifest is not valid JSON.
	#[error("parse config: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("{0}")]
	Validation(String),
	/// The environment name is not one of the embedded deployments.
	#[error(
		"unknown environment {0:?}, expected one of: anvil, mainnet, testnet, testnet-staging, testnet-dev"
	)]
	UnknownEnvironment(String),
	/// No configuration source was given.
	#[error("one of environment, file-path, or json is required")]
	SourceRequired,
	/// More than one configuration source was given.
	#[error("environment, file-path, and json are mutually exclusive")]
	MutuallyExclusive,
	/// A remote manifest is larger than [`MAX_CONFIG_SIZE`].
	#[error("fetch {url}: response exceeds {limit} bytes")]
	TooLarge { url: String, limit: usize },
	/// A remote manifest was answered with a non-2xx status.
	#[error("fetch {url}: status {status}")]
	HttpStatus { url: String, status: u16 },
	/// The remote manifest could not be fetched.
	#[error("fetch {url}: {reason}")]
	Fetch { url: String, reason: String },
	/// A `file://` URI whose path does not decode to UTF-8.
	#[error("invalid file URL {0:?}")]
	InvalidFileUrl(String),
}

impl From<serde_json::Error> for ConfigError {
	fn from(err: serde_json::Error) -> Self {
		ConfigError::Parse(err.to_string())
	}
}
