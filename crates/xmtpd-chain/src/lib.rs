//! Blockchain access for registry administration.
//!
//! This crate owns the RPC connection to a chain and the transaction
//! lifecycle every administrative operation goes through: build, broadcast,
//! wait for inclusion, then decode and verify the event that confirms the
//! state change. It also provides a small generic binder that turns any
//! `sol!` contract interface into typed calls, transactions and event
//! cursors.
//!
//! Nothing in this crate retries or terminates the process. Every failure is
//! returned to the caller, who decides the retry policy.

use alloy_primitives::{Address, Bytes, Log, TxHash, B256, U256};
use alloy_rpc_types::TransactionRequest;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use xmtpd_account::AccountError;
use xmtpd_types::TransactionReceipt;

pub mod contract;
pub mod errors;
pub mod executor;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

pub use contract::{BoundContract, DecodedEvent, EventCursor};
pub use errors::ProtocolError;
pub use executor::{
	execute_transaction, wait_for_transaction, ExecutorOptions, ExpectedEvent, TransactOpts,
	DEFAULT_GAS_LIMIT,
};
pub use implementations::evm::alloy::AlloyChainClient;
#[cfg(any(test, feature = "testing"))]
pub use implementations::mock::{MockChainClient, MockOutcome};

/// Errors that can occur while talking to a chain.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Error that occurs during RPC communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The signer, the client or the endpoint disagree on the chain ID.
	#[error("Chain ID mismatch: expected {expected}, got {actual}")]
	ChainIdMismatch { expected: u64, actual: u64 },
	/// The sending account cannot pay for gas.
	#[error("Account {0} has zero balance")]
	ZeroBalance(Address),
	/// Error returned by a transaction builder before anything was sent.
	#[error("Failed to build transaction: {0}")]
	Build(String),
	/// The transaction was mined but execution reverted.
	#[error("Transaction {tx_hash} reverted: {reason}")]
	Reverted {
		tx_hash: TxHash,
		reason: String,
		protocol_error: Option<ProtocolError>,
	},
	/// The transaction was not mined within the allowed time.
	#[error("Timed out after {timeout:?} waiting for transaction {tx_hash}")]
	Timeout { tx_hash: TxHash, timeout: Duration },
	/// The transaction succeeded but did not emit the expected event.
	#[error("Event {event} from {contract} not found in transaction {tx_hash}{}", detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default())]
	EventNotFound {
		event: &'static str,
		contract: Address,
		tx_hash: TxHash,
		detail: Option<String>,
	},
	/// Error that occurs when ABI data cannot be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The decoded event did not match what the caller asked for.
	#[error("Verification failed: {0}")]
	Verification(String),
	/// Error raised by the transaction signer.
	#[error(transparent)]
	Account(#[from] AccountError),
}

impl ChainError {
	/// Returns the contract error behind this failure, if one can be
	/// identified.
	///
	/// Reverts carry it directly. RPC and build errors are searched for a
	/// known error selector, since nodes report reverted gas estimations
	/// and calls as messages containing the revert data.
	pub fn protocol_error(&self) -> Option<ProtocolError> {
		match self {
			ChainError::Reverted { protocol_error, .. } => *protocol_error,
			ChainError::Network(message) | ChainError::Build(message) => {
				ProtocolError::from_message(message)
			},
			_ => None,
		}
	}

	/// True if the contract rejected the call because it would not change
	/// any state.
	pub fn is_no_change(&self) -> bool {
		self.protocol_error().is_some_and(|e| e.is_no_change())
	}
}

/// Parameters of an `eth_getLogs` query for a single event of a single
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
	pub address: Address,
	pub event_signature: B256,
	pub from_block: u64,
	pub to_block: u64,
}

/// A log together with its position on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
	pub log: Log,
	pub block_number: Option<u64>,
	pub transaction_hash: Option<TxHash>,
	pub log_index: Option<u64>,
}

/// Trait defining the interface to a chain's JSON-RPC endpoint.
///
/// Implementations are shared between concurrent calls and hold no state
/// that needs locking.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Chain ID this client was configured for.
	fn chain_id(&self) -> u64;

	/// Chain ID reported by the endpoint.
	async fn rpc_chain_id(&self) -> Result<u64, ChainError>;

	/// Fails unless the endpoint reports the configured chain ID.
	async fn verify_chain_id(&self) -> Result<(), ChainError> {
		let actual = self.rpc_chain_id().await?;
		if actual != self.chain_id() {
			return Err(ChainError::ChainIdMismatch {
				expected: self.chain_id(),
				actual,
			});
		}
		Ok(())
	}

	/// Native balance of an account at the latest block.
	async fn get_balance(&self, address: Address) -> Result<U256, ChainError>;

	/// Latest block number.
	async fn get_block_number(&self) -> Result<u64, ChainError>;

	/// Executes a read-only call and returns the raw return data.
	async fn call(&self, request: TransactionRequest) -> Result<Bytes, ChainError>;

	/// Signs and broadcasts a transaction, returning its hash.
	async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, ChainError>;

	/// Receipt of a transaction, or `None` while it is not mined.
	async fn get_transaction_receipt(
		&self,
		hash: TxHash,
	) -> Result<Option<TransactionReceipt>, ChainError>;

	/// Logs of one event of one contract in a block range.
	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError>;

	/// Revert data of a failed transaction, if the endpoint can trace it.
	async fn trace_revert(&self, hash: TxHash) -> Result<Option<Bytes>, ChainError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::mock::MockChainClient;

	#[tokio::test]
	async fn test_verify_chain_id() {
		let client = MockChainClient::new(31337);
		client.verify_chain_id().await.unwrap();

		let client = MockChainClient::new(84532).with_rpc_chain_id(31337);
		let err = client.verify_chain_id().await.unwrap_err();
		assert!(matches!(
			err,
			ChainError::ChainIdMismatch {
				expected: 84532,
				actual: 31337
			}
		));
		assert_eq!(client.request_count(), 1);
	}

	#[test]
	fn test_protocol_error_from_messages() {
		let err = ChainError::Network(
			"server returned an error response: error code 3: execution reverted, data: \"0xa88ee577\""
				.to_string(),
		);
		assert!(err.is_no_change());

		let err = ChainError::Build("execution reverted: 0xd08a05d5".to_string());
		assert_eq!(err.protocol_error().unwrap().signature(), "NotNodeOwner()");
		assert!(!err.is_no_change());

		assert!(ChainError::Network("connection refused".to_string())
			.protocol_error()
			.is_none());
		assert!(ChainError::ZeroBalance(Address::ZERO).protocol_error().is_none());
	}

	#[test]
	fn test_event_not_found_message() {
		let err = ChainError::EventNotFound {
			event: "NodeAdded(uint256,address,bytes,string,uint256)",
			contract: Address::ZERO,
			tx_hash: TxHash::ZERO,
			detail: None,
		};
		assert!(err.to_string().starts_with("Event NodeAdded("));

		let err = ChainError::EventNotFound {
			event: "NodeAdded",
			contract: Address::ZERO,
			tx_hash: TxHash::ZERO,
			detail: Some("bad data".to_string()),
		};
		assert!(err.to_string().ends_with(": bad data"));
	}
}
