//! Deployment manifests embedded in the binary.

use crate::ConfigError;
use std::fmt;
use std::str::FromStr;

/// A named contracts deployment.
///
/// Names are matched exactly: `Testnet` or ` testnet` are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
	Anvil,
	Mainnet,
	Testnet,
	TestnetStaging,
	TestnetDev,
}

impl Environment {
	pub const ALL: [Environment; 5] = [
		Environment::Anvil,
		Environment::Mainnet,
		Environment::Testnet,
		Environment::TestnetStaging,
		Environment::TestnetDev,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Environment::Anvil => "anvil",
			Environment::Mainnet => "mainnet",
			Environment::Testnet => "testnet",
			Environment::TestnetStaging => "testnet-staging",
			Environment::TestnetDev => "testnet-dev",
		}
	}

	/// Returns the embedded JSON manifest for this deployment.
	pub fn manifest(&self) -> &'static [u8] {
		match self {
			Environment::Anvil => include_bytes!("environments/anvil.json"),
			Environment::Mainnet => include_bytes!("environments/mainnet.json"),
			Environment::Testnet => include_bytes!("environments/testnet.json"),
			Environment::TestnetStaging => include_bytes!("environments/testnet-staging.json"),
			Environment::TestnetDev => include_bytes!("environments/testnet-dev.json"),
		}
	}
}

impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Environment::ALL
			.into_iter()
			.find(|env| env.as_str() == s)
			.ok_or_else(|| ConfigError::UnknownEnvironment(s.to_string()))
	}
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
