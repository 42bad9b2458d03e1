//! Transaction receipt types.

use alloy_primitives::{Log, TxHash};

/// Receipt of a mined transaction.
///
/// Carries the logs emitted by the transaction so callers can decode the
/// event that confirms the state change they requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TxHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Logs emitted during execution, in emission order.
	pub logs: Vec<Log>,
}
