//! Node registry administration.
//!
//! [`NodeRegistryAdmin`] performs the state-changing registry operations,
//! each one a single transaction confirmed by the event the contract emits.
//! [`NodeRegistryCaller`] reads registry state without a signer.

use alloy_primitives::U256;
use thiserror::Error;
use xmtpd_chain::{ChainError, ProtocolError};

pub mod admin;
pub mod bindings;
pub mod caller;
#[cfg(test)]
mod fake;

pub use admin::NodeRegistryAdmin;
pub use bindings::NodeRegistry;
pub use caller::NodeRegistryCaller;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
	/// A chain operation failed. `target` names the node or owner involved.
	#[error("{operation} failed for {target}: {source}")]
	Chain {
		operation: &'static str,
		target: String,
		#[source]
		source: ChainError,
	},
	/// The registry returned a node ID that does not fit in 32 bits.
	#[error("Node ID {0} is out of range")]
	InvalidNodeId(U256),
}

impl RegistryError {
	pub fn chain_error(&self) -> Option<&ChainError> {
		match self {
			RegistryError::Chain { source, .. } => Some(source),
			RegistryError::InvalidNodeId(_) => None,
		}
	}

	/// Contract error behind the failure, if one was identified.
	pub fn protocol_error(&self) -> Option<ProtocolError> {
		self.chain_error().and_then(ChainError::protocol_error)
	}
}

pub(crate) fn node_id_from(value: U256) -> Result<u32, RegistryError> {
	u32::try_from(value).map_err(|_| RegistryError::InvalidNodeId(value))
}
